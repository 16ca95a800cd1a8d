use std::sync::{Arc, Once};

use relidx::{
    CounterMetrics, EdgeIndex, EdgeKey, IndexError, IndexOptions, NodeId, RelId, Result,
    TypeRegistry,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relidx=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

#[test]
fn subclass_scenario() -> Result<()> {
    init_tracing();
    let index = EdgeIndex::new(IndexOptions::default())?;
    assert_eq!(index.resolve_type("SUBCLASS_OF")?.0, 0);
    index.put(NodeId(10), NodeId(20), "SUBCLASS_OF", RelId(1000))?;
    assert!(index.contains_key(NodeId(10), NodeId(20), "SUBCLASS_OF"));
    assert_eq!(index.get(NodeId(10), NodeId(20), "SUBCLASS_OF"), Some(RelId(1000)));
    // Direction matters.
    assert!(!index.contains_key(NodeId(20), NodeId(10), "SUBCLASS_OF"));
    // Type matters.
    assert!(!index.contains_key(NodeId(10), NodeId(20), "PART_OF"));
    Ok(())
}

#[test]
fn last_write_wins() -> Result<()> {
    let index = EdgeIndex::new(IndexOptions::default())?;
    assert_eq!(index.put(NodeId(1), NodeId(2), "T", RelId(5))?, None);
    assert_eq!(index.put(NodeId(1), NodeId(2), "T", RelId(6))?, Some(RelId(5)));
    assert_eq!(index.get(NodeId(1), NodeId(2), "T"), Some(RelId(6)));
    assert_eq!(index.size(), 1);
    Ok(())
}

#[test]
fn million_sequential_edges() -> Result<()> {
    init_tracing();
    const EDGES: u64 = 1_000_000;
    let index = EdgeIndex::new(IndexOptions::default())?;
    let types = ["SUBCLASS_OF", "PART_OF", "RELATED_TO", "HAS_PART"];
    for i in 0..EDGES {
        let ty = types[(i % types.len() as u64) as usize];
        index.put(NodeId(i / 3), NodeId(i), ty, RelId(EDGES + i))?;
    }
    assert_eq!(index.size(), EDGES as usize);
    for i in 0..EDGES {
        let ty = types[(i % types.len() as u64) as usize];
        assert_eq!(index.get(NodeId(i / 3), NodeId(i), ty), Some(RelId(EDGES + i)));
    }
    let stats = index.stats();
    assert_eq!(stats.edges, EDGES as usize);
    assert!(stats.load_factor <= index.max_load_factor());
    Ok(())
}

#[test]
fn growth_preserves_every_mapping() -> Result<()> {
    let counters = Arc::new(CounterMetrics::default());
    let index = EdgeIndex::new(IndexOptions::default().shards(2).metrics(counters.clone()))?;
    let ty = index.resolve_type("T")?;
    let mut seen = Vec::new();
    for i in 0..5_000u64 {
        let key = EdgeKey::new(NodeId(i * 31), NodeId(i ^ 0x55), ty);
        index.put_key(key, RelId(i))?;
        seen.push((key, RelId(i)));
    }
    let before = index.stats();
    index.reserve(100_000)?;
    let after = index.stats();
    assert!(after.capacity > before.capacity);
    assert_eq!(after.edges, before.edges);
    for (key, rel) in &seen {
        assert_eq!(index.get_key(key), Some(*rel));
    }
    assert!(
        counters
            .resizes
            .load(std::sync::atomic::Ordering::Relaxed)
            > 2
    );
    Ok(())
}

#[test]
fn shared_registry_outlives_session() -> Result<()> {
    let registry = Arc::new(TypeRegistry::new());
    let first = EdgeIndex::with_registry(Arc::clone(&registry), IndexOptions::default())?;
    first.put(NodeId(1), NodeId(2), "SUBCLASS_OF", RelId(1))?;
    drop(first);

    registry.resolve("PART_OF")?;
    let second = EdgeIndex::with_registry(Arc::clone(&registry), IndexOptions::default())?;
    assert!(second.is_empty());
    assert_eq!(second.resolve_type("SUBCLASS_OF")?.0, 0);
    assert_eq!(second.resolve_type("PART_OF")?.0, 1);
    Ok(())
}

#[test]
fn unknown_type_is_a_contract_error() -> Result<()> {
    let index = EdgeIndex::new(IndexOptions::default())?;
    let foreign = TypeRegistry::new();
    let ty = foreign.resolve("ELSEWHERE")?;
    let err = index
        .put_key(EdgeKey::new(NodeId(1), NodeId(1), ty), RelId(1))
        .unwrap_err();
    assert!(matches!(err, IndexError::UnknownType(_)));
    assert!(matches!(
        index.registry().token_for(ty),
        Err(IndexError::UnknownType(_))
    ));
    Ok(())
}

#[test]
fn presized_from_toml() -> Result<()> {
    let opts = IndexOptions::from_toml_str(
        r#"
initial_capacity = 50000
shards = 16
max_load_factor = 0.6
"#,
    )?;
    let index = EdgeIndex::new(opts)?;
    let stats = index.stats();
    assert_eq!(stats.shards, 16);
    assert!(stats.capacity as f64 * 0.6 >= 50_000.0);
    Ok(())
}
