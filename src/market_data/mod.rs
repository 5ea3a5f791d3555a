// Market data module entrypoint
pub mod adapters;   // token list sources (mock API + synthetic generator)
pub mod cache;      // per-category staleness cache
pub mod emitter;    // simulated live price ticks
pub mod router;     // binds category selection to fetch + live feed
