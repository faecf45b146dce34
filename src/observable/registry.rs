use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::sync::RwLock;

use crate::config::config;
use crate::observable::channel::{ChannelHandle, SubscriptionChannel, TuplePush, TupleReceiver};
use crate::observable::provider::TuplesProvider;
use crate::tuple::TupleSelector;

/// Errors from the tuple observable.
///
/// `ChannelGone` never escapes `notify_of_update`; it exists so delivery
/// failures carry the dead handle to the pruning pass and the logs.
#[derive(Debug, Error)]
pub enum ObservableError {
    #[error("A provider is already registered for data set: {0}")]
    DuplicateProvider(String),

    #[error("Provider for {name} failed: {message}")]
    ProviderFailed { name: String, message: String },

    #[error("Subscriber channel {0} is gone")]
    ChannelGone(ChannelHandle),
}

/// The observable registry: data-set providers on one side, live
/// subscription channels on the other.
///
/// Constructed once at plugin start and shared by `Arc`; the live-channel
/// map is the only shared mutable state and every access goes through the
/// lock.
pub struct TupleObservable {
    name: String,
    channel_capacity: usize,
    providers: RwLock<HashMap<String, Arc<dyn TuplesProvider>>>,
    channels: RwLock<HashMap<ChannelHandle, SubscriptionChannel>>,
}

impl TupleObservable {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, config().observable.channel_capacity)
    }

    pub fn with_capacity(name: impl Into<String>, channel_capacity: usize) -> Self {
        Self {
            name: name.into(),
            channel_capacity,
            providers: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Associate a data-set name with the provider that produces its
    /// current tuples. Each name can be claimed once.
    pub async fn register_provider(
        &self,
        data_set: impl Into<String>,
        provider: Arc<dyn TuplesProvider>,
    ) -> Result<(), ObservableError> {
        let data_set = data_set.into();
        let mut providers = self.providers.write().await;
        if providers.contains_key(&data_set) {
            return Err(ObservableError::DuplicateProvider(data_set));
        }

        tracing::debug!(observable = %self.name, data_set = %data_set, "provider registered");
        providers.insert(data_set, provider);
        Ok(())
    }

    /// Open a channel for the given selector.
    ///
    /// Deliberately permissive: no check that a provider exists yet, so
    /// subscribers may bind before the providing side has started.
    pub async fn subscribe(&self, selector: TupleSelector) -> (ChannelHandle, TupleReceiver) {
        let (channel, receiver) = SubscriptionChannel::new(selector, self.channel_capacity);
        let handle = channel.handle;

        {
            let mut channels = self.channels.write().await;
            channels.insert(handle, channel);
        }

        if config().observable.debug_logging {
            tracing::debug!(observable = %self.name, %handle, "subscription created");
        }
        (handle, receiver)
    }

    /// Idempotent removal; unknown handles are ignored.
    pub async fn unsubscribe(&self, handle: ChannelHandle) {
        let removed = {
            let mut channels = self.channels.write().await;
            channels.remove(&handle)
        };

        if let Some(channel) = removed {
            if config().observable.debug_logging {
                tracing::debug!(
                    observable = %self.name,
                    %handle,
                    selector = %channel.selector,
                    pushes_sent = channel.pushes_sent.load(Ordering::Relaxed),
                    "subscription removed"
                );
            }
        }
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Re-read the data set through its provider and push fresh tuples to
    /// every channel whose selector matches.
    ///
    /// Missing providers make this a no-op. Delivery is isolated per
    /// channel: a full queue drops that one push, a closed receiver gets the
    /// channel pruned, and neither is surfaced to the caller. Only a
    /// provider failure is.
    pub async fn notify_of_update(
        &self,
        selector: &TupleSelector,
    ) -> Result<(), ObservableError> {
        let provider = {
            let providers = self.providers.read().await;
            providers.get(&selector.name).cloned()
        };
        let Some(provider) = provider else {
            tracing::debug!(
                observable = %self.name,
                data_set = %selector.name,
                "no provider registered, skipping notification"
            );
            return Ok(());
        };

        // Snapshot matching channels; provider calls and fan-out run
        // without holding the lock.
        let matching: Vec<DeliveryTarget> = {
            let channels = self.channels.read().await;
            channels
                .values()
                .filter(|channel| selector.matches(&channel.selector))
                .map(|channel| DeliveryTarget {
                    handle: channel.handle,
                    selector: channel.selector.clone(),
                    sender: channel.sender.clone(),
                    pushes_sent: Arc::clone(&channel.pushes_sent),
                })
                .collect()
        };

        if matching.is_empty() {
            return Ok(());
        }

        // One provider invocation per distinct subscriber selector; channels
        // sharing a selector share the produced tuples.
        let mut groups: Vec<(TupleSelector, Vec<DeliveryTarget>)> = Vec::new();
        for target in matching {
            match groups.iter().position(|(s, _)| *s == target.selector) {
                Some(i) => groups[i].1.push(target),
                None => groups.push((target.selector.clone(), vec![target])),
            }
        }

        let observable_name = self.name.clone();
        let deliveries = groups.into_iter().map(|(group_selector, members)| {
            let provider = Arc::clone(&provider);
            let observable_name = observable_name.clone();
            async move {
                let tuples = provider.make_tuples(&group_selector).await?;
                let push = TuplePush {
                    selector: group_selector,
                    tuples,
                };

                let mut gone = Vec::new();
                for target in members {
                    match target.sender.try_send(push.clone()) {
                        Ok(()) => {
                            target.pushes_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!(
                                observable = %observable_name,
                                handle = %target.handle,
                                "subscriber queue full, dropping delivery"
                            );
                        }
                        Err(TrySendError::Closed(_)) => {
                            let err = ObservableError::ChannelGone(target.handle);
                            tracing::error!(observable = %observable_name, "{}", err);
                            gone.push(target.handle);
                        }
                    }
                }
                Ok::<Vec<ChannelHandle>, ObservableError>(gone)
            }
        });

        let results = futures::future::join_all(deliveries).await;

        let mut gone = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(dead) => gone.extend(dead),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if !gone.is_empty() {
            let mut channels = self.channels.write().await;
            for handle in gone {
                channels.remove(&handle);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Drop every live channel. Subscribers observe their receiver closing.
    pub async fn shutdown(&self) {
        let drained = {
            let mut channels = self.channels.write().await;
            channels.drain().count()
        };
        tracing::debug!(observable = %self.name, channels = drained, "observable shut down");
    }
}

struct DeliveryTarget {
    handle: ChannelHandle,
    selector: TupleSelector,
    sender: Sender<TuplePush>,
    pushes_sent: Arc<AtomicU64>,
}
