//! Peer link table.
//!
//! One logical link per neighbor, keyed by neighbor name. A link is the
//! sending half of some connection's writer queue, so queuing a line never
//! blocks and works the same whether the TCP connect has finished yet or not.
//!
//! Entries are removed by `(neighbor, id)` so a connection that dies late
//! cannot evict the link that replaced it.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::mpsc;

/// Identifies one link instance; never reused within a process.
pub type LinkId = u64;

/// Feeds a connection's writer task. Items are written verbatim.
pub type LineSender = mpsc::UnboundedSender<String>;

/// Receiving end of a writer queue.
pub type LineReceiver = mpsc::UnboundedReceiver<String>;

/// Lifecycle of a link. A closed link is simply absent from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Registered, TCP connect in flight; lines queue up until it finishes.
    Connecting,
    /// Connection is up.
    Established,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Established => write!(f, "Established"),
        }
    }
}

/// Who opened the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// We dialed the neighbor.
    Outbound,
    /// The neighbor dialed us and identified itself with an AT line.
    Inbound,
}

/// A live link to one neighbor.
#[derive(Debug)]
pub struct PeerLink {
    pub neighbor: String,
    pub id: LinkId,
    pub state: LinkState,
    pub direction: LinkDirection,
    tx: LineSender,
}

impl PeerLink {
    /// Queue one protocol line. False if the connection is gone.
    pub fn send_line(&self, line: &str) -> bool {
        self.tx.send(format!("{line}\n")).is_ok()
    }
}

/// An outbound link that was just registered and still has to be dialed.
///
/// Lines sent before the dial completes wait in `rx`; the first one
/// written is the update that caused the link to exist. `tx` feeds the same
/// queue and lets the connection answer lines its neighbor sends back.
#[derive(Debug)]
pub struct PendingDial {
    pub neighbor: String,
    pub id: LinkId,
    pub tx: LineSender,
    pub rx: LineReceiver,
}

/// Live links by neighbor name.
#[derive(Debug, Default)]
pub struct PeerLinkManager {
    links: HashMap<String, PeerLink>,
    next_id: LinkId,
}

impl PeerLinkManager {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh link id.
    pub fn next_link_id(&mut self) -> LinkId {
        self.next_id += 1;
        self.next_id
    }

    /// Existing link to `neighbor`, in any state.
    pub fn get(&self, neighbor: &str) -> Option<&PeerLink> {
        self.links.get(neighbor)
    }

    /// Return the link to `neighbor`, registering a Connecting one if none
    /// exists. The second value is `Some` only when a new link was created;
    /// the caller must dial it.
    pub fn get_or_create(&mut self, neighbor: &str) -> (&PeerLink, Option<PendingDial>) {
        let mut dial = None;
        let next_id = &mut self.next_id;
        let link = self.links.entry(neighbor.to_string()).or_insert_with(|| {
            *next_id += 1;
            let id = *next_id;
            let (tx, rx) = mpsc::unbounded_channel();
            dial = Some(PendingDial {
                neighbor: neighbor.to_string(),
                id,
                tx: tx.clone(),
                rx,
            });
            PeerLink {
                neighbor: neighbor.to_string(),
                id,
                state: LinkState::Connecting,
                direction: LinkDirection::Outbound,
                tx,
            }
        });
        (link, dial)
    }

    /// Adopt an accepted connection as the link to `neighbor`.
    ///
    /// Only takes effect when no link exists; false leaves the table as is.
    pub fn bind_inbound(&mut self, neighbor: &str, id: LinkId, tx: LineSender) -> bool {
        if self.links.contains_key(neighbor) {
            return false;
        }
        self.links.insert(
            neighbor.to_string(),
            PeerLink {
                neighbor: neighbor.to_string(),
                id,
                state: LinkState::Established,
                direction: LinkDirection::Inbound,
                tx,
            },
        );
        true
    }

    /// Connecting → Established. False if the link was replaced or removed.
    pub fn mark_established(&mut self, neighbor: &str, id: LinkId) -> bool {
        match self.links.get_mut(neighbor) {
            Some(link) if link.id == id => {
                link.state = LinkState::Established;
                true
            }
            _ => false,
        }
    }

    /// Drop the link to `neighbor` if it is still instance `id`.
    pub fn remove(&mut self, neighbor: &str, id: LinkId) -> bool {
        match self.links.get(neighbor) {
            Some(link) if link.id == id => {
                self.links.remove(neighbor);
                true
            }
            _ => false,
        }
    }

    /// Number of live links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_once_then_reuses() {
        let mut links = PeerLinkManager::new();

        let (link, dial) = links.get_or_create("Hamilton");
        assert_eq!(link.state, LinkState::Connecting);
        assert_eq!(link.direction, LinkDirection::Outbound);
        let first_id = link.id;
        assert!(dial.is_some());

        let (link, dial) = links.get_or_create("Hamilton");
        assert_eq!(link.id, first_id);
        assert!(dial.is_none(), "second dial while connecting");
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn lines_queue_before_connect() {
        let mut links = PeerLinkManager::new();
        let (link, dial) = links.get_or_create("Welsh");
        assert!(link.send_line("AT one"));
        assert!(link.send_line("AT two"));

        let mut rx = dial.unwrap().rx;
        assert_eq!(rx.try_recv().unwrap(), "AT one\n");
        assert_eq!(rx.try_recv().unwrap(), "AT two\n");
    }

    #[test]
    fn send_fails_once_receiver_is_gone() {
        let mut links = PeerLinkManager::new();
        let (_, dial) = links.get_or_create("Welsh");
        drop(dial.unwrap().rx);
        assert!(!links.get("Welsh").unwrap().send_line("AT lost"));
    }

    #[test]
    fn establish_and_remove_check_id() {
        let mut links = PeerLinkManager::new();
        let (link, _dial) = links.get_or_create("Ball");
        let id = link.id;

        assert!(!links.mark_established("Ball", id + 100));
        assert!(links.mark_established("Ball", id));
        assert_eq!(links.get("Ball").unwrap().state, LinkState::Established);

        assert!(!links.remove("Ball", id + 100));
        assert!(links.remove("Ball", id));
        assert!(links.get("Ball").is_none());
    }

    #[test]
    fn recreated_link_gets_new_id() {
        let mut links = PeerLinkManager::new();
        let first = links.get_or_create("Ball").0.id;
        links.remove("Ball", first);
        let (link, dial) = links.get_or_create("Ball");
        assert_ne!(link.id, first);
        assert!(dial.is_some());
    }

    #[test]
    fn inbound_binds_only_when_absent() {
        let mut links = PeerLinkManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = links.next_link_id();

        assert!(links.bind_inbound("Holiday", id, tx.clone()));
        let link = links.get("Holiday").unwrap();
        assert_eq!(link.direction, LinkDirection::Inbound);
        assert_eq!(link.state, LinkState::Established);
        assert!(link.send_line("AT via inbound"));
        assert_eq!(rx.try_recv().unwrap(), "AT via inbound\n");

        let other = links.next_link_id();
        assert!(!links.bind_inbound("Holiday", other, tx));
        assert_eq!(links.get("Holiday").unwrap().id, id);
    }

    #[test]
    fn outbound_reuses_inbound_link() {
        let mut links = PeerLinkManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = links.next_link_id();
        links.bind_inbound("Holiday", id, tx);

        let (link, dial) = links.get_or_create("Holiday");
        assert_eq!(link.id, id);
        assert!(dial.is_none());
    }
}
