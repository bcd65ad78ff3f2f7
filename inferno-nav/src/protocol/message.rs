//! Server-to-console messages and the outbound queue.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::planning::{GridCoord, NodeKind};

/// Terminator of variable-length payloads.
pub const PATH_SENTINEL: &str = "D";

/// A single protocol line sent to the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    /// `N x y kind`
    NodeUpdate { cell: GridCoord, kind: NodeKind },
    /// `FP x y ... D`
    FullPath(Vec<GridCoord>),
    /// `SP x y ... D`
    SimplePath(Vec<GridCoord>),
    /// `R x y`
    RoverAt(GridCoord),
    /// `DR`
    DestinationReached,
}

fn write_path(f: &mut fmt::Formatter<'_>, tag: &str, cells: &[GridCoord]) -> fmt::Result {
    write!(f, "{}", tag)?;
    for cell in cells {
        write!(f, " {}", cell)?;
    }
    write!(f, " {}", PATH_SENTINEL)
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMessage::NodeUpdate { cell, kind } => write!(f, "N {} {}", cell, kind.code()),
            OutboundMessage::FullPath(cells) => write_path(f, "FP", cells),
            OutboundMessage::SimplePath(cells) => write_path(f, "SP", cells),
            OutboundMessage::RoverAt(cell) => write!(f, "R {}", cell),
            OutboundMessage::DestinationReached => write!(f, "DR"),
        }
    }
}

/// Unbounded FIFO shared by every producer; drained by the gateway.
///
/// Clones share the same queue.
#[derive(Clone, Debug)]
pub struct OutboundQueue {
    tx: Sender<OutboundMessage>,
    rx: Receiver<OutboundMessage>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, message: OutboundMessage) {
        log::trace!("Queue: {}", message);
        // Cannot fail: the queue holds its own receiver
        let _ = self.tx.send(message);
    }

    /// Take every queued message in FIFO order.
    pub fn drain(&self) -> Vec<OutboundMessage> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wire_format() {
        let path = vec![GridCoord::new(0, 0), GridCoord::new(1, 1)];
        assert_eq!(OutboundMessage::FullPath(path.clone()).to_string(), "FP 0 0 1 1 D");
        assert_eq!(OutboundMessage::SimplePath(path[1..].to_vec()).to_string(), "SP 1 1 D");
        assert_eq!(OutboundMessage::SimplePath(Vec::new()).to_string(), "SP D");
        assert_eq!(OutboundMessage::RoverAt(GridCoord::new(3, 7)).to_string(), "R 3 7");
        assert_eq!(OutboundMessage::DestinationReached.to_string(), "DR");
        assert_eq!(
            OutboundMessage::NodeUpdate {
                cell: GridCoord::new(4, 5),
                kind: NodeKind::Obstacle
            }
            .to_string(),
            "N 4 5 1"
        );
    }

    #[test]
    fn test_queue_preserves_order_across_producers() {
        let queue = OutboundQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let q = queue.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        q.push(OutboundMessage::RoverAt(GridCoord::new(t, i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let drained = queue.drain();
        assert_eq!(drained.len(), 200);
        assert!(queue.is_empty());

        // Per-producer FIFO
        for t in 0..4 {
            let rows: Vec<i32> = drained
                .iter()
                .filter_map(|m| match m {
                    OutboundMessage::RoverAt(c) if c.x == t => Some(c.y),
                    _ => None,
                })
                .collect();
            assert_eq!(rows, (0..50).collect::<Vec<_>>());
        }
    }
}
