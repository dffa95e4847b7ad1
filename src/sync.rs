/*
 * The synchronisation primitives shared between the tasks.
 *
 * None of these are globals. The board binary creates each primitive once, in
 * a `static`, and hands references to the tasks that need them. Mutation is
 * arbitrated by the primitive itself:
 *
 * - `SharedReading`: exclusive lock with bounded waits, one writer and any
 *   number of readers.
 * - `ModeSignal`: level-triggered broadcast flag, set and cleared manually.
 * - `ButtonEdge`: lock-free single-slot token raised from interrupt context.
 */

pub mod button_edge;
pub mod mode_signal;
pub mod shared_reading;

pub use button_edge::ButtonEdge;
pub use mode_signal::ModeSignal;
pub use shared_reading::{Reading, SharedReading};
