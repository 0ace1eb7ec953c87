//! Client code for the offline cache controller.
//!
//! This crate provides the network layer and the controller itself: lifecycle
//! handlers, fetch interception, background sync, and page messaging. Hosts
//! drive it by forwarding platform events.

pub mod controller;
pub mod fetch;

pub use controller::{
    ActivateReport, CacheController, ClientInfo, ClientReceiver, Clients, ControlCommand, ControlReply,
    ControllerConfig, ControllerMessage, FetchOutcome, InstallReport, Registration, ResponseSource, Route,
    RoutingPolicy, SyncReport, WorkerState,
};

pub use fetch::{FetchClient, FetchConfig, NAVIGATION_ACCEPT, Network};
