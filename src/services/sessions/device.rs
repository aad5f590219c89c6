use crate::domain::entities::DeviceType;

const BOT_MARKERS: [&str; 6] = ["bot", "crawler", "spider", "curl", "wget", "python-requests"];

/// User-Agent 문자열로 기기 종류를 분류합니다.
pub fn classify_device(user_agent: &str) -> DeviceType {
    let ua = user_agent.trim().to_ascii_lowercase();
    if ua.is_empty() {
        return DeviceType::Unknown;
    }

    if BOT_MARKERS.iter().any(|marker| ua.contains(marker)) {
        DeviceType::Bot
    } else if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
        DeviceType::Tablet
    } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("android") {
        DeviceType::Mobile
    } else if ua.contains("windows") || ua.contains("macintosh") || ua.contains("x11") || ua.contains("linux") {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_device() {
        let cases = [
            ("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36", DeviceType::Desktop),
            ("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148", DeviceType::Mobile),
            ("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile Safari/537.36", DeviceType::Mobile),
            ("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)", DeviceType::Tablet),
            ("Mozilla/5.0 (Linux; Android 13; SM-X700) Safari/537.36", DeviceType::Tablet),
            ("Googlebot/2.1 (+http://www.google.com/bot.html)", DeviceType::Bot),
            ("curl/8.4.0", DeviceType::Bot),
            ("", DeviceType::Unknown),
            ("SomethingElse/1.0", DeviceType::Unknown),
        ];

        for (ua, expected) in cases {
            assert_eq!(classify_device(ua), expected, "{}", ua);
        }
    }
}
