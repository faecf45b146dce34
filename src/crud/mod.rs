// CRUD handlers for persisted tuples.
//
// The generic handler knows nothing about subscriptions; it only runs its
// registered extensions after a successful commit. The observable bridge is
// one such extension, wired in at plugin start.

pub mod extension;
pub mod handler;
pub mod observable_ext;

pub use extension::{CrudHandlerExtension, ExtensionContext, ExtensionError};
pub use handler::{CrudError, OrmCrudHandler};
pub use observable_ext::UpdateObservableExtension;
