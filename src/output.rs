use color_print::cprintln;

/// Where nodes surface what the token brings them.
pub trait Output: Send + Sync {
    /// A node consumed a message addressed to it.
    fn delivered(&self, index: u32, payload: &str);

    /// The coordinator consumed the reply of a message it sent.
    fn acknowledged(&self, payload: &str);
}

/// Prints deliveries on stdout, one line each.
#[derive(Debug, Default, Clone, Copy)]
pub struct Console;

impl Output for Console {
    fn delivered(&self, index: u32, payload: &str) {
        cprintln!("<bold>node {}</bold> received {:?}", index, payload);
    }

    fn acknowledged(&self, payload: &str) {
        cprintln!("<bold>reply from ring:</bold> {:?}", payload);
    }
}
