pub mod enqueue_message;
pub mod get_message;
pub mod requeue_stale;
pub mod retry_message;
pub mod run_dispatch_cycle;
pub mod set_paused;
