// Tuple observable: decouples data mutation from data delivery.
//
// The registry owns every live subscription channel. Mutation code never
// talks to subscribers directly; it raises a selector-keyed notification and
// the registry re-reads the data through the registered provider and fans
// the fresh tuples out.

pub mod channel;
pub mod provider;
pub mod registry;

pub use channel::{ChannelHandle, TuplePush, TupleReceiver};
pub use provider::{OrmTuplesProvider, TuplesProvider};
pub use registry::{ObservableError, TupleObservable};
