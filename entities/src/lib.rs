//! sea-orm entities for the bookgate schema. Kept in sync with the `migration` crate.

pub mod books;
pub mod reading_progress;
pub mod sessions;
pub mod users;

pub mod prelude {
    pub use super::books::Entity as Books;
    pub use super::reading_progress::Entity as ReadingProgress;
    pub use super::sessions::Entity as Sessions;
    pub use super::users::Entity as Users;
}
