//! Thin façade over the parallel runtime: serial, in-process ranks on
//! threads, or MPI.
//!
//! The only collective this crate needs is an all-gather of one `i64` per
//! rank (see [`slot_offsets`](crate::algs::slot_offsets)). It is a blocking
//! synchronization point: every rank must call it, and it returns only once
//! all ranks have contributed.

use crate::algs::wire::{WireI64, cast_slice, decode_i64};
use crate::mesh_error::{CommFailure, PioError};
use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Tag reserved for [`Communicator::all_gather_i64`].
pub const ALL_GATHER_TAG: u16 = 0x5049;

/// Point-to-point messaging plus the all-gather built on it.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Gather one value from every rank; entry `r` is rank `r`'s value.
    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, PioError> {
        let (me, size) = (self.rank(), self.size());
        let mut out = vec![0i64; size];
        out[me] = value;
        if size == 1 {
            return Ok(out);
        }

        let msg = WireI64::new(value);
        let sends: Vec<_> = (0..size)
            .filter(|&peer| peer != me)
            .map(|peer| self.isend(peer, ALL_GATHER_TAG, cast_slice(std::slice::from_ref(&msg))))
            .collect();

        // Drain every receive even after a failure so no message is left queued.
        let mut maybe_err = None;
        for peer in (0..size).filter(|&p| p != me) {
            let mut buf = [0u8; std::mem::size_of::<WireI64>()];
            let data = self.irecv(peer, ALL_GATHER_TAG, &mut buf).wait();
            let decoded = match data {
                Some(bytes) => decode_i64(&bytes),
                None => Err(format!("no value received from rank {peer}")),
            };
            match decoded {
                Ok(v) => out[peer] = v,
                Err(reason) if maybe_err.is_none() => {
                    maybe_err = Some(PioError::CommError {
                        neighbor: peer,
                        source: CommFailure(reason),
                    });
                }
                Err(_) => {}
            }
        }
        for s in sends {
            let _ = s.wait();
        }
        match maybe_err {
            Some(e) => Err(e),
            None => Ok(out),
        }
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Single-rank runtime for serial use and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

// --- LocalComm: ranks as threads of one process ---
type Key = (u64, usize, usize, u16); // (world, src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);

/// Delivery counter; receivers sleep on the condvar until the next delivery.
static ARRIVALS: Lazy<(Mutex<u64>, Condvar)> = Lazy::new(|| (Mutex::new(0), Condvar::new()));

fn take(key: &Key) -> Option<Bytes> {
    MAILBOX.get_mut(key).and_then(|mut queue| queue.pop_front())
}

/// Receive handle of [`LocalComm`]; `wait` blocks until the message arrives.
pub struct LocalHandle {
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let (lock, arrived) = &*ARRIVALS;
        let mut seen = lock.lock();
        loop {
            // Checked under the lock, so a delivery cannot slip in before we sleep.
            if let Some(bytes) = take(&self.key) {
                let n = bytes.len().min(self.len);
                return Some(bytes[..n].to_vec());
            }
            arrived.wait(&mut seen);
        }
    }
}

/// In-process ranks exchanging messages through a shared mailbox.
///
/// Ranks of one group share a `world` id; distinct ids keep concurrent
/// groups apart.
#[derive(Clone, Debug)]
pub struct LocalComm {
    world: u64,
    rank: usize,
    size: usize,
}

impl LocalComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self::in_world(0, rank, size)
    }

    pub fn in_world(world: u64, rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self { world, rank, size }
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        let key = (self.world, self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        let (lock, arrived) = &*ARRIVALS;
        *lock.lock() += 1;
        arrived.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        LocalHandle {
            key: (self.world, peer, self.rank, tag),
            len: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{
        Communicator as _, CommunicatorCollectives as _, Destination as _, Source as _,
    };

    /// MPI world communicator. The caller keeps the `mpi::environment::Universe`
    /// alive for as long as this value is used.
    #[derive(Clone, Debug)]
    pub struct MpiComm {
        pub rank: usize,
        pub size: usize,
    }

    impl MpiComm {
        pub fn new() -> Self {
            let world = SimpleCommunicator::world();
            Self {
                rank: world.rank() as usize,
                size: world.size() as usize,
            }
        }
    }

    impl Default for MpiComm {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Completed MPI operation; carries the payload for receives.
    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            let world = SimpleCommunicator::world();
            world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiHandle {
            let world = SimpleCommunicator::world();
            let (msg, _status) = world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            MpiHandle(Some(msg))
        }

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, PioError> {
            let world = SimpleCommunicator::world();
            let mut out = vec![0i64; self.size];
            world.all_gather_into(&value, &mut out[..]);
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn no_comm_gathers_itself() {
        assert_eq!(NoComm.all_gather_i64(17).unwrap(), vec![17]);
    }

    #[test]
    #[serial]
    fn local_roundtrip_two_ranks() {
        let comm0 = LocalComm::in_world(101, 0, 2);
        let comm1 = LocalComm::in_world(101, 1, 2);

        let mut recv_buf = [0u8; 4];
        let recv_handle = comm1.irecv(0, 7, &mut recv_buf);
        comm0.isend(1, 7, &[1, 2, 3, 4]);

        let data = recv_handle
            .wait()
            .expect("Expected to receive data from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(&recv_buf, &[1, 2, 3, 4]);
    }

    #[test]
    #[serial]
    fn local_all_gather_three_ranks() {
        let handles: Vec<_> = (0..3)
            .map(|r| {
                std::thread::spawn(move || {
                    let comm = LocalComm::in_world(102, r, 3);
                    comm.all_gather_i64(10 * (r as i64 + 1)).unwrap()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), vec![10, 20, 30]);
        }
    }

    #[test]
    #[serial]
    fn repeated_gathers_do_not_mix() {
        let handles: Vec<_> = (0..2)
            .map(|r| {
                std::thread::spawn(move || {
                    let comm = LocalComm::in_world(103, r, 2);
                    let a = comm.all_gather_i64(r as i64).unwrap();
                    let b = comm.all_gather_i64(100 + r as i64).unwrap();
                    (a, b)
                })
            })
            .collect();
        for h in handles {
            let (a, b) = h.join().unwrap();
            assert_eq!(a, vec![0, 1]);
            assert_eq!(b, vec![100, 101]);
        }
    }
}
