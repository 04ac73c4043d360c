// core logic - ai relay, auth, database, and the allergy safety check

mod ai;
mod auth;
mod db;
mod safety;

pub use ai::{
    FAILURE_MARKER, Gemini, RelayOutcome, TextModel, assistant_prompt, question_prompt, relay,
};
pub use auth::{
    AdminConfig, AuthConfig, Claims, hash_password, issue_token, verify_password, verify_token,
};
pub use db::{
    CatalogProduct, CatalogRecipe, ContactMessage, Db, JournalProduct, JournalRecipe, NewUser,
    User, UserUpdate,
};
pub use safety::is_safe;
