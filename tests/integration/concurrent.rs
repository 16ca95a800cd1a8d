use relidx::{EdgeIndex, EdgeKey, IndexOptions, NodeId, RelId, Result, TypeId};
use std::sync::{Arc, Barrier};
use std::thread;

const NUM_THREADS: usize = 8;
const EDGES_PER_THREAD: usize = 20_000;

fn edge(thread_id: usize, i: usize) -> (NodeId, NodeId) {
    let base = (thread_id * EDGES_PER_THREAD + i) as u64;
    (NodeId(base), NodeId(base.wrapping_mul(2_654_435_761) % 100_003))
}

#[test]
fn concurrent_disjoint_inserts() -> Result<()> {
    // Small shard count and no pre-sizing so shards grow while contended.
    let index = Arc::new(EdgeIndex::new(IndexOptions::default().shards(4))?);
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];

    for thread_id in 0..NUM_THREADS {
        let index = Arc::clone(&index);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            let ty = if thread_id % 2 == 0 { "SUBCLASS_OF" } else { "PART_OF" };
            for i in 0..EDGES_PER_THREAD {
                let (src, dst) = edge(thread_id, i);
                index.put(src, dst, ty, RelId((thread_id * EDGES_PER_THREAD + i) as u64))?;
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().unwrap()?;
    }

    assert_eq!(index.size(), NUM_THREADS * EDGES_PER_THREAD);
    for thread_id in 0..NUM_THREADS {
        let ty = if thread_id % 2 == 0 { "SUBCLASS_OF" } else { "PART_OF" };
        for i in 0..EDGES_PER_THREAD {
            let (src, dst) = edge(thread_id, i);
            assert_eq!(
                index.get(src, dst, ty),
                Some(RelId((thread_id * EDGES_PER_THREAD + i) as u64))
            );
        }
    }
    Ok(())
}

#[test]
fn readers_run_alongside_writers() -> Result<()> {
    let index = Arc::new(EdgeIndex::new(IndexOptions::default().shards(2))?);
    let ty = index.resolve_type("LINKS")?;
    // Seed edges that readers check throughout.
    for i in 0..1_000u64 {
        index.put_key(EdgeKey::new(NodeId(i), NodeId(0), ty), RelId(i))?;
    }

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];
    for thread_id in 0..NUM_THREADS {
        let index = Arc::clone(&index);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            if thread_id % 2 == 0 {
                let base = 1_000_000 * (thread_id as u64 + 1);
                for i in 0..EDGES_PER_THREAD as u64 {
                    index.put_key(EdgeKey::new(NodeId(base + i), NodeId(1), ty), RelId(i))?;
                }
            } else {
                for round in 0..20u64 {
                    for i in 0..1_000u64 {
                        let key = EdgeKey::new(NodeId(i), NodeId(0), ty);
                        assert_eq!(index.get_key(&key), Some(RelId(i)), "round {round}");
                    }
                }
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().unwrap()?;
    }
    assert_eq!(index.size(), 1_000 + (NUM_THREADS / 2) * EDGES_PER_THREAD);
    Ok(())
}

#[test]
fn concurrent_type_resolution_converges() -> Result<()> {
    let index = Arc::new(EdgeIndex::new(IndexOptions::default())?);
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<(TypeId, TypeId)> {
                barrier.wait();
                Ok((index.resolve_type("X")?, index.resolve_type("Y")?))
            })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.join().unwrap()?);
    }
    let (x, y) = results[0];
    assert_ne!(x, y);
    assert!(results.iter().all(|pair| *pair == (x, y)));
    assert_eq!(index.registry().len(), 2);
    Ok(())
}

#[test]
fn concurrent_batches_then_freeze() -> Result<()> {
    let index = Arc::new(EdgeIndex::new(IndexOptions::default().shards(8))?);
    let ty = index.resolve_type("T")?;
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|thread_id| {
            let index = Arc::clone(&index);
            thread::spawn(move || -> Result<usize> {
                let batch: Vec<(EdgeKey, RelId)> = (0..5_000u64)
                    .map(|i| {
                        let src = NodeId(thread_id as u64);
                        (EdgeKey::new(src, NodeId(i), ty), RelId(i))
                    })
                    .collect();
                index.put_batch(&batch)
            })
        })
        .collect();
    let mut inserted = 0;
    for handle in handles {
        inserted += handle.join().unwrap()?;
    }
    assert_eq!(inserted, NUM_THREADS * 5_000);

    let index = Arc::try_unwrap(index).unwrap_or_else(|_| panic!("index still shared"));
    let frozen = index.freeze()?;
    assert_eq!(frozen.len(), NUM_THREADS * 5_000);
    assert_eq!(
        frozen.get_key(&EdgeKey::new(NodeId(3), NodeId(4_999), ty)),
        Some(RelId(4_999))
    );
    Ok(())
}
