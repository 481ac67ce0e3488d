/// Control surface of the host's replay buffer.
///
/// The buffer itself belongs to the host; the script only queries it and asks
/// it to start or stop.
pub trait ReplayBufferControl {
    fn is_active(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
}
