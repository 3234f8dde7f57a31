//! Reusable admin screen building blocks.

pub mod crud;
pub mod singleton;
pub mod toast;

pub use crud::{
    Confirmation, CrudError, CrudScreen, InsertAt, ListFilter, Searchable, load_screen,
    save_screen,
};
pub use singleton::{Singleton, SingletonRecord, SingletonState};
pub use toast::{Toast, ToastKind, push_flash, take_flash};
