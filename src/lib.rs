mod actions;
mod api;
mod channel;
mod core;
mod error;
mod logging;
mod state;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use api::*;
pub use channel::*;
pub use error::ApiError;
pub use state::*;
pub use updates::*;

/// Receives every state snapshot the engine emits. Implemented by whatever
/// renders the state; registered once via [`ChatApp::listen_for_updates`].
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

/// Composition root: owns the actor thread and the channels into and out of
/// it. Cheap to clone the `Arc`; all methods are callable from any thread.
pub struct ChatApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    api: SharedApi,
    channel_connector: SharedChannelConnector,
}

impl ChatApp {
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging();
        tracing::info!(data_dir = %data_dir, "ChatApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));
        let api: SharedApi = Arc::new(RwLock::new(None));
        let channel_connector: SharedChannelConnector = Arc::new(RwLock::new(None));

        // Actor loop thread (single threaded "app actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        let api_for_core = api.clone();
        let connector_for_core = channel_connector.clone();
        thread::spawn(move || {
            let mut core = crate::core::AppCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                shared_for_core,
                api_for_core,
                connector_for_core,
            );
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            api,
            channel_connector,
        })
    }

    /// Latest committed snapshot. Always available, even before the first
    /// update is emitted.
    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }
}

impl ChatApp {
    pub fn set_api_for_tests(&self, api: Arc<dyn Api>) {
        match self.api.write() {
            Ok(mut slot) => {
                *slot = Some(api);
            }
            Err(poison) => {
                *poison.into_inner() = Some(api);
            }
        }
    }

    pub fn set_channel_connector_for_tests(&self, connector: Arc<dyn ChannelConnector>) {
        match self.channel_connector.write() {
            Ok(mut slot) => {
                *slot = Some(connector);
            }
            Err(poison) => {
                *poison.into_inner() = Some(connector);
            }
        }
    }
}
