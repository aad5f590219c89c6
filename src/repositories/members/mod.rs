pub mod member_repository;

pub use member_repository::{InMemoryMemberRepository, MemberRemoval, MongoMemberRepository, UserLookup};
