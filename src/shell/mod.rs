// Composition root.
//
// - `state` wires adapters into use case handlers.
// - `http` exposes event delivery, subscription and admin routes.
// - `workers` holds background loops started next to the server.

pub mod http;
pub mod state;
pub mod workers;
