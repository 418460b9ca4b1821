// Composition root for the outbox relay.
//
// Responsibilities
// - Read config from environment.
// - Instantiate the outbox store, scope factory and publishers.
// - Wire them into the outbox client and processor.
// - Spawn the scheduler that runs processing passes.
// - Expose the HTTP router (enqueue, manual pass, health).

pub mod config;
pub mod health;
pub mod http;
pub mod state;
pub mod workers;
