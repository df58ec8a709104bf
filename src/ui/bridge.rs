// UiBridge - Hands work between the tokio runtime and the Slint event loop
//
// Slint components may only be touched on the thread running the event loop, while the
// converter is supervised on tokio worker threads. The bridge queues UI updates onto the
// event loop and spawns async work from Slint callbacks.

use slint::{ComponentHandle, Weak};
use std::future::Future;

/// Coordinates between the tokio runtime and the Slint event loop
///
/// # Example
/// ```ignore
/// let bridge = UiBridge::new(&ui, runtime.handle().clone());
///
/// bridge.spawn(async move {
///     let exit_code = session.pump_events(handle).await;
///     bridge_clone.post(move |ui| ui.set_is_converting(false));
/// });
/// ```
pub struct UiBridge<T: ComponentHandle> {
    /// Weak reference so pending updates never keep a closed window alive
    ui_weak: Weak<T>,

    tokio_handle: tokio::runtime::Handle,
}

impl<T: ComponentHandle + 'static> UiBridge<T> {
    pub fn new(ui: &T, tokio_handle: tokio::runtime::Handle) -> Self {
        Self {
            ui_weak: ui.as_weak(),
            tokio_handle,
        }
    }

    /// Queue a UI update from any thread
    ///
    /// The update runs on the next event loop iteration. It is dropped if the
    /// window has already been destroyed or the event loop has stopped.
    pub fn post<F>(&self, update: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        if let Err(e) = self.ui_weak.upgrade_in_event_loop(move |ui| update(&ui)) {
            tracing::warn!("Failed to queue UI update to event loop: {:?}", e);
        }
    }

    /// Spawn async work on the tokio runtime, typically from a Slint callback
    pub fn spawn<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.tokio_handle.spawn(future);
    }

    pub fn runtime(&self) -> &tokio::runtime::Handle {
        &self.tokio_handle
    }
}

// Manual Clone implementation to avoid requiring T: Clone
impl<T: ComponentHandle> Clone for UiBridge<T> {
    fn clone(&self) -> Self {
        Self {
            ui_weak: self.ui_weak.clone(),
            tokio_handle: self.tokio_handle.clone(),
        }
    }
}
