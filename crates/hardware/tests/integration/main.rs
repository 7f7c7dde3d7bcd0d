//! End-to-end controller and simulator tests.


/// Refresh scheduling under load: forcing, liveness and credit bounds.
mod refresh;


/// Trace legality and request ordering across devices and policies.
mod scheduling;
