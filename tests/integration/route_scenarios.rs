#![allow(missing_docs)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;
use wikiroute::query::{RouteFinder, RouteOptions, WikiGraph};
use wikiroute::storage::{ser, AdjacencyIndex, PageRecord, PageStore, ReadOptions};
use wikiroute::{PageId, RouteError};

fn page(id: u32, title: &str, links: &[u32]) -> PageRecord {
    let links: Vec<PageId> = links.iter().copied().map(PageId).collect();
    PageRecord::encode(PageId(id), &links, title, false).unwrap()
}

fn graph(pages: Vec<PageRecord>) -> WikiGraph {
    WikiGraph::new(pages).unwrap()
}

fn titles(graph: &WikiGraph, start: &str, end: &str) -> Vec<String> {
    graph
        .find_route(start, end)
        .unwrap()
        .titles()
        .map(str::to_string)
        .collect()
}

#[test]
fn direct_link() {
    let g = graph(vec![page(1, "A", &[2]), page(2, "B", &[])]);
    assert_eq!(titles(&g, "A", "B"), ["A", "B"]);
}

#[test]
fn no_path() {
    let g = graph(vec![page(1, "A", &[2]), page(2, "B", &[]), page(3, "C", &[])]);
    assert_eq!(
        g.find_route("A", "C").unwrap_err(),
        RouteError::NoRouteFound {
            start: "A".into(),
            end: "C".into()
        }
    );
}

#[test]
fn same_endpoint() {
    let g = graph(vec![page(1, "A", &[2]), page(2, "B", &[])]);
    let route = g.find_route("A", "A").unwrap();
    assert_eq!(route.hops(), 0);
    assert_eq!(route.titles().collect::<Vec<_>>(), ["A"]);
}

#[test]
fn missing_endpoint_flags_start_only() {
    let g = graph(vec![page(1, "A", &[])]);
    let err = g.find_route("Nonexistent", "A").unwrap_err();
    assert!(err.start_missing());
    assert!(!err.end_missing());
}

#[test]
fn shortcut_wins_over_chain() {
    let g = graph(vec![
        page(1, "A", &[2, 4]),
        page(2, "B", &[3]),
        page(3, "C", &[4]),
        page(4, "D", &[]),
    ]);
    assert_eq!(titles(&g, "A", "D"), ["A", "D"]);
}

#[test]
fn dangling_links_never_error() {
    let g = graph(vec![
        page(1, "A", &[1000, 2]),
        page(2, "B", &[2000]),
        page(3, "C", &[3000]),
    ]);
    assert_eq!(titles(&g, "A", "B"), ["A", "B"]);
    assert!(matches!(
        g.find_route("B", "C"),
        Err(RouteError::NoRouteFound { .. })
    ));
}

#[test]
fn redirects_are_followed_like_links() {
    let g = graph(vec![
        PageRecord::encode(PageId(1), &[PageId(2)], "Suomi", true).unwrap(),
        page(2, "Finland", &[3]),
        page(3, "Sauna", &[]),
    ]);
    assert_eq!(titles(&g, "Suomi", "Sauna"), ["Suomi", "Finland", "Sauna"]);
    assert_eq!(g.stats().redirects, 1);
}

#[test]
fn graph_loaded_from_disk_routes_identically() {
    let pages = vec![
        page(1, "A", &[2, 3]),
        page(2, "B", &[4]),
        page(3, "C", &[4]),
        page(4, "D", &[5]),
        page(5, "E", &[]),
    ];
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("small.wikiroute");
    ser::save(&path, &pages).unwrap();
    let loaded = WikiGraph::open(
        &path,
        &ReadOptions::default().window_bytes(32),
        RouteOptions::default(),
    )
    .unwrap();
    let in_memory = graph(pages);
    assert_eq!(
        loaded.find_route("A", "E").unwrap().hops(),
        in_memory.find_route("A", "E").unwrap().hops()
    );
    assert_eq!(loaded.stats(), in_memory.stats());
}

fn random_graph(rng: &mut ChaCha8Rng, nodes: u32, max_degree: usize) -> Vec<PageRecord> {
    (0..nodes)
        .map(|id| {
            let degree = rng.gen_range(0..=max_degree);
            let mut links: Vec<PageId> = (0..degree)
                .map(|_| PageId(rng.gen_range(0..nodes + nodes / 10)))
                .collect();
            links.sort_unstable();
            links.dedup();
            PageRecord::encode(PageId(id), &links, &format!("N{id}"), false).unwrap()
        })
        .collect()
}

#[test]
fn bidirectional_matches_unidirectional_on_random_graphs() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for round in 0..8 {
        let nodes = rng.gen_range(50..400);
        let store = PageStore::new(random_graph(&mut rng, nodes, 4)).unwrap();
        let forward = AdjacencyIndex::forward(&store).unwrap();
        let reverse = forward.reverse().unwrap();
        for _ in 0..40 {
            let start = PageId(rng.gen_range(0..nodes));
            let end = PageId(rng.gen_range(0..nodes));
            let one_sided = RouteFinder::new(&forward, None).find(start, end);
            for limit in [0, 8, 1 << 18] {
                let two_sided = RouteFinder::new(&forward, Some(&reverse))
                    .frontier_limit(limit)
                    .find(start, end);
                assert_eq!(
                    two_sided.len(),
                    one_sided.len(),
                    "round {round}: {start} -> {end} with limit {limit}"
                );
            }
        }
    }
}

#[test]
fn concurrent_queries_match_sequential_ones() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let g = WikiGraph::new(random_graph(&mut rng, 300, 3)).unwrap();
    let pairs: Vec<(String, String)> = (0..64)
        .map(|_| {
            (
                format!("N{}", rng.gen_range(0..300)),
                format!("N{}", rng.gen_range(0..300)),
            )
        })
        .collect();
    let parallel = g.find_routes(&pairs);
    for ((start, end), result) in pairs.iter().zip(parallel) {
        let sequential = g.find_route(start, end);
        match (result, sequential) {
            (Ok(a), Ok(b)) => assert_eq!(a.hops(), b.hops()),
            (Err(a), Err(b)) => assert_eq!(a, b),
            (a, b) => panic!("{start} -> {end}: {a:?} vs {b:?}"),
        }
    }
}
