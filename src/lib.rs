// allergyguard library - allergy-aware meal companion backend

pub mod cli;
mod core;
mod error;
mod server;

pub use core::{
    AdminConfig, AuthConfig, CatalogProduct, CatalogRecipe, Claims, ContactMessage, Db,
    FAILURE_MARKER, Gemini, JournalProduct, JournalRecipe, NewUser, RelayOutcome, TextModel, User,
    UserUpdate, assistant_prompt, hash_password, is_safe, issue_token, question_prompt, relay,
    verify_password, verify_token,
};
pub use error::Error;
pub use server::{Server, ServerConfig};
