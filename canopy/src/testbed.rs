//! A simulated link layer for exercising the mesh without hardware.
//!
//! An [`Air`] is the shared medium: every node attached to it gets a
//! [`SimRadio`] with a virtual millisecond clock and a [`SimNetwork`] that
//! stands in for the tree-routing layer. The air routes frames along the
//! octal tree, answers discovery polls on behalf of attached nodes, can
//! sever the link between any two nodes, and can drop frames at a seeded
//! random rate.
//!
//! Virtual time never blocks: a radio's clock advances by one millisecond
//! every time it is read, so a bounded 150 ms wait is simply 150 polls.

mod network;
mod radio;

pub use network::SimNetwork;
pub use radio::SimRadio;

use canopy_core::allocator::MAX_CHILDREN;
use canopy_core::net::frame::{Frame, Header, MessageType};
use canopy_core::{Mesh, MeshError, NodeAddr};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Identifies a node on the air, independent of whatever route-address it
/// currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

/// The shared medium. Clone handles freely; they all point at the same
/// air.
#[derive(Clone, Default)]
pub struct Air {
    inner: Arc<Mutex<AirState>>,
}

impl Air {
    pub fn new() -> Self {
        Default::default()
    }

    /// Attaches a new node and hands back its radio and routing layer.
    pub fn endpoint(&self) -> (SimRadio, SimNetwork) {
        let handle = {
            let mut air = self.inner.lock().unwrap();
            air.nodes.push(NodeSlot::default());
            air.nodes.len() - 1
        };
        (
            SimRadio::new(self.inner.clone(), handle),
            SimNetwork::new(self.inner.clone(), handle),
        )
    }

    /// Severs the radio link between two nodes in both directions.
    pub fn sever(&self, a: NodeHandle, b: NodeHandle) {
        self.inner.lock().unwrap().severed.insert(link_key(a.0, b.0));
    }

    /// Restores a severed link.
    pub fn restore(&self, a: NodeHandle, b: NodeHandle) {
        self.inner.lock().unwrap().severed.remove(&link_key(a.0, b.0));
    }

    /// Makes every delivery fail with the given probability, reproducibly.
    pub fn set_loss(&self, rate: f64, seed: u64) {
        self.inner.lock().unwrap().loss = Some(Lossy {
            rate,
            rng: StdRng::seed_from_u64(seed),
        });
    }
}

fn link_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

struct Lossy {
    rate: f64,
    rng: StdRng,
}

struct NodeSlot {
    addr: NodeAddr,
    listening: bool,
    no_poll: bool,
    bypass_holds: bool,
    hold_incoming: bool,
    inbox: VecDeque<Vec<u8>>,
}

impl Default for NodeSlot {
    fn default() -> Self {
        Self {
            addr: NodeAddr::DEFAULT,
            listening: true,
            no_poll: false,
            bypass_holds: false,
            hold_incoming: false,
            inbox: VecDeque::new(),
        }
    }
}

#[derive(Default)]
struct AirState {
    nodes: Vec<NodeSlot>,
    severed: HashSet<(usize, usize)>,
    loss: Option<Lossy>,
}

impl AirState {
    fn lose(&mut self) -> bool {
        match self.loss.as_mut() {
            Some(lossy) => lossy.rng.gen_bool(lossy.rate),
            None => false,
        }
    }

    fn link_ok(&self, a: usize, b: usize) -> bool {
        !self.severed.contains(&link_key(a, b))
    }

    /// The node currently holding `addr`, if any. The unconfigured address
    /// is shared and never resolves to a single node.
    fn handle_at(&self, addr: NodeAddr) -> Option<usize> {
        if addr == NodeAddr::DEFAULT {
            return None;
        }
        self.nodes.iter().position(|node| node.addr == addr)
    }

    fn deliver(&mut self, to: usize, bytes: Vec<u8>) {
        if self.nodes[to].listening {
            self.nodes[to].inbox.push_back(bytes);
        }
    }

    /// Sends a frame routed along the tree. Fails when any hop on the path
    /// is unoccupied or severed.
    fn routed(&mut self, from: usize, mut header: Header, payload: &[u8]) -> bool {
        header.src = self.nodes[from].addr;
        self.nodes[from].listening = true;

        let hops = match self.route_handles(header.src, header.dst) {
            Some(hops) => hops,
            None => return false,
        };
        if self.lose() {
            return false;
        }

        let bytes = Frame::new(header, payload).build();
        match hops.last() {
            Some(&last) => {
                self.deliver(last, bytes);
                true
            }
            None => false,
        }
    }

    /// Sends a frame straight to a neighbor. Directing at the unconfigured
    /// address reaches every attached node that has not joined yet.
    fn direct(&mut self, from: usize, mut header: Header, payload: &[u8], to: NodeAddr) -> bool {
        header.src = self.nodes[from].addr;
        self.nodes[from].listening = true;
        let bytes = Frame::new(header, payload).build();

        if to == NodeAddr::DEFAULT {
            let targets: Vec<usize> = (0..self.nodes.len())
                .filter(|&i| {
                    i != from
                        && self.nodes[i].addr == NodeAddr::DEFAULT
                        && self.nodes[i].listening
                        && self.link_ok(from, i)
                })
                .collect();
            let mut delivered = false;
            for target in targets {
                if self.lose() {
                    continue;
                }
                self.deliver(target, bytes.clone());
                delivered = true;
            }
            delivered
        } else {
            let target = match self.handle_at(to) {
                Some(target) => target,
                None => return false,
            };
            if !self.link_ok(from, target) || self.lose() {
                return false;
            }
            self.deliver(target, bytes);
            true
        }
    }

    /// Fans a frame out to every listener at a tree level. Discovery polls
    /// are answered here on behalf of the polled nodes, the way a real
    /// routing layer replies without involving the application.
    fn multicast(&mut self, from: usize, mut header: Header, payload: &[u8], level: u8) -> bool {
        let from_addr = self.nodes[from].addr;
        header.src = from_addr;
        self.nodes[from].listening = true;

        let targets: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| {
                i != from
                    && self.nodes[i].addr != NodeAddr::DEFAULT
                    && self.nodes[i].addr.level() == level
                    && self.nodes[i].listening
                    && self.link_ok(from, i)
            })
            .collect();

        if header.msg_type == MessageType::Poll {
            for target in targets {
                if self.nodes[target].no_poll || self.lose() {
                    continue;
                }
                let mut reply = Header::new(from_addr, MessageType::Poll);
                reply.src = self.nodes[target].addr;
                let bytes = Frame::new(reply, Vec::new()).build();
                self.deliver(from, bytes);
            }
        } else {
            let bytes = Frame::new(header, payload).build();
            for target in targets {
                if self.lose() {
                    continue;
                }
                self.deliver(target, bytes.clone());
            }
        }
        true
    }

    fn route_handles(&self, from: NodeAddr, to: NodeAddr) -> Option<Vec<usize>> {
        let mut handles = Vec::new();
        for addr in tree_path(from, to) {
            handles.push(self.handle_at(addr)?);
        }
        for pair in handles.windows(2) {
            if !self.link_ok(pair[0], pair[1]) {
                return None;
            }
        }
        Some(handles)
    }

    /// Which of a node's child slots are occupied, as a bit-field with bit
    /// `i` meaning slot `i + 1`.
    fn child_bits(&self, parent: NodeAddr) -> u8 {
        let mut bits = 0;
        for slot in 1..=MAX_CHILDREN {
            if self.handle_at(parent.child(slot)).is_some() {
                bits |= 1 << (slot - 1);
            }
        }
        bits
    }
}

fn parent_of(addr: NodeAddr) -> NodeAddr {
    let level = addr.level();
    if level == 0 {
        return addr;
    }
    let shift = 3 * (level - 1);
    NodeAddr::new(addr.to_u16() & !(0o7 << shift))
}

fn is_ancestor(ancestor: NodeAddr, addr: NodeAddr) -> bool {
    let bits = 3 * u16::from(ancestor.level());
    let mask = (1u32 << bits) - 1;
    ancestor.level() <= addr.level()
        && u32::from(addr.to_u16()) & mask == u32::from(ancestor.to_u16())
}

/// The hop sequence between two tree positions: up from `from` to the
/// deepest common ancestor, then down to `to`.
fn tree_path(from: NodeAddr, to: NodeAddr) -> Vec<NodeAddr> {
    let mut path = vec![from];
    let mut up = from;
    while !is_ancestor(up, to) {
        up = parent_of(up);
        path.push(up);
    }

    let mut down = Vec::new();
    let mut cursor = to;
    while cursor != up {
        down.push(cursor);
        cursor = parent_of(cursor);
    }
    path.extend(down.into_iter().rev());
    path
}

/// Drives a mesh node from a background thread so another node's blocking
/// operation (a join, a lookup) has a live peer to talk to.
pub struct Pump {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Mesh<SimRadio, SimNetwork>>,
}

impl Pump {
    pub fn spawn(mut mesh: Mesh<SimRadio, SimNetwork>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                mesh.update();
                mesh.dhcp();
                thread::yield_now();
            }
            mesh
        });
        Self { stop, thread }
    }

    /// Stops the pump and hands the mesh back for inspection.
    pub fn stop(self) -> Mesh<SimRadio, SimNetwork> {
        self.stop.store(true, Ordering::Relaxed);
        self.thread.join().expect("pump thread panicked")
    }
}

/// Retries a mesh operation a few times; scheduling can make a single
/// bounded wait miss a reply that a real deployment would simply retry.
pub fn retry<T>(
    tries: usize,
    mut attempt: impl FnMut() -> Result<T, MeshError>,
) -> Result<T, MeshError> {
    let mut result = attempt();
    for _ in 1..tries {
        if result.is_ok() {
            break;
        }
        result = attempt();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_tree() {
        assert_eq!(
            tree_path(NodeAddr::new(0o1), NodeAddr::COORDINATOR),
            vec![NodeAddr::new(0o1), NodeAddr::COORDINATOR]
        );
        assert_eq!(
            tree_path(NodeAddr::new(0o12), NodeAddr::new(0o2)),
            vec![NodeAddr::new(0o12), NodeAddr::new(0o2)]
        );
        assert_eq!(
            tree_path(NodeAddr::new(0o12), NodeAddr::new(0o1)),
            vec![
                NodeAddr::new(0o12),
                NodeAddr::new(0o2),
                NodeAddr::COORDINATOR,
                NodeAddr::new(0o1),
            ]
        );
        assert_eq!(
            tree_path(NodeAddr::COORDINATOR, NodeAddr::COORDINATOR),
            vec![NodeAddr::COORDINATOR]
        );
    }

    #[test]
    fn parents_strip_the_deepest_digit() {
        assert_eq!(parent_of(NodeAddr::new(0o312)), NodeAddr::new(0o12));
        assert_eq!(parent_of(NodeAddr::new(0o2)), NodeAddr::COORDINATOR);
        assert_eq!(parent_of(NodeAddr::COORDINATOR), NodeAddr::COORDINATOR);
    }
}
