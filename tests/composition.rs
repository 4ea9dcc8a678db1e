// Composition tests: the full induction chain on a corpus small enough to
// check by hand.
//
//   segment -> accumulate -> fit -> save/load -> evaluate -> induce
//
// Vocabulary a=(1,0), b=(0,1), c=(1,1); corpus "a b c" and "a b"; window 2.
// Frequencies come out as a=1, b=1.5, c=0.5 and the averaged contexts as
// a=(1,1), b=(1,4/3), c=(1,2). The least-squares map from those onto the
// embeddings is W = [[5/14, -4/7], [3/14, 6/7]].

use std::io::Cursor;

use alacarte::cooccurrence::accumulate;
use alacarte::corpus::pipeline::{segment, PoolOptions};
use alacarte::embeddings::table::EmbeddingTable;
use alacarte::error::InductionError;
use alacarte::evaluate::{cosine_similarity, evaluate};
use alacarte::induction::induce;
use alacarte::{persist, solver};

const EPS: f64 = 1e-9;

fn table() -> EmbeddingTable {
    EmbeddingTable::from_entries(
        2,
        [
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![1.0, 1.0]),
        ],
    )
    .unwrap()
}

fn options() -> PoolOptions {
    PoolOptions {
        workers: 2,
        queue_depth: 1,
    }
}

// ============================================================
// Chain: segment -> accumulate -> fit
// ============================================================

#[tokio::test]
async fn hand_computed_induction_matrix() {
    let table = table();
    let corpus = segment(Cursor::new("A b c\n\na  B\n"), options())
        .await
        .unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.documents()[0].tokens(), &["a", "b", "c"]);

    let counts = accumulate(&corpus, &table, 2).unwrap();
    assert_eq!(counts.windows, 3);
    assert_eq!(counts.frequencies, vec![1.0, 1.5, 0.5]);

    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap();
    let w = induction.matrix();
    assert_eq!(w.shape(), (2, 2));
    let expected = [[5.0 / 14.0, -4.0 / 7.0], [3.0 / 14.0, 6.0 / 7.0]];
    for (i, row) in expected.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            assert!(
                (w[(i, j)] - value).abs() < EPS,
                "W[{i},{j}] = {}, expected {value}",
                w[(i, j)]
            );
        }
    }
}

#[tokio::test]
async fn unseen_vocabulary_is_left_out_of_the_regression() {
    let table = EmbeddingTable::from_entries(
        2,
        [
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.0, 1.0]),
            ("c", vec![1.0, 1.0]),
            ("never", vec![9.0, -9.0]),
        ],
    )
    .unwrap();
    let corpus = segment(Cursor::new("a b c\n\na b\n"), options())
        .await
        .unwrap();

    let counts = accumulate(&corpus, &table, 2).unwrap();
    assert_eq!(solver::select_supported(&counts.frequencies).count_ones(), 3);

    // The extra row has no context, so the fit matches the three-word case.
    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap();
    assert!((induction.matrix()[(0, 0)] - 5.0 / 14.0).abs() < EPS);
    assert!((induction.matrix()[(1, 1)] - 6.0 / 7.0).abs() < EPS);
}

#[tokio::test]
async fn corpus_without_known_words_cannot_be_fit() {
    let table = table();
    let corpus = segment(Cursor::new("x y z\n"), options()).await.unwrap();
    let counts = accumulate(&corpus, &table, 2).unwrap();
    assert_eq!(counts.windows, 2);
    assert!(counts.frequencies.iter().all(|f| *f == 0.0));

    let err = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap_err();
    assert!(matches!(err, InductionError::Degenerate(_)), "got {err:?}");
}

// ============================================================
// Chain: fit -> save -> load -> evaluate
// ============================================================

#[tokio::test]
async fn persisted_matrix_scores_the_same_corpus() {
    let table = table();
    let corpus = segment(Cursor::new("a b c\n\na b\n"), options())
        .await
        .unwrap();
    let counts = accumulate(&corpus, &table, 2).unwrap();
    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("A.bin");
    persist::save(&path, &induction).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"2 2\n"));
    assert_eq!(bytes.len(), 4 + 4 * 8);

    let loaded = persist::load(&path).unwrap();
    assert_eq!(loaded, induction);

    // Centers are b, c, b. Both b windows predict a vector along (2, 1),
    // the c window one along (11, 16).
    let stats = evaluate(&corpus, &table, &loaded, 2).unwrap();
    let b_score = 2.0 / 20.0_f64.sqrt();
    let c_score = 27.0 / 754.0_f64.sqrt();
    assert_eq!(stats.samples, 3);
    assert!((stats.median - b_score).abs() < EPS, "median {}", stats.median);
    let deviation = (c_score - b_score).abs() / 3.0_f64.sqrt();
    assert!(
        (stats.deviation - deviation).abs() < EPS,
        "deviation {}",
        stats.deviation
    );
}

// ============================================================
// Chain: fit -> induce
// ============================================================

#[tokio::test]
async fn induced_vector_points_toward_the_word() {
    let table = table();
    let corpus = segment(Cursor::new("a b c\n\na b\n"), options())
        .await
        .unwrap();
    let counts = accumulate(&corpus, &table, 2).unwrap();
    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap();

    let induced = induce(&table, &induction, &["b", "c"]).unwrap();
    assert!((induced[0] - 11.0 / 28.0).abs() < EPS);
    assert!((induced[1] - 16.0 / 28.0).abs() < EPS);
    assert!(cosine_similarity(&induced, &[1.0, 1.0]) > 0.98);

    // Unknown context words stand in as the vocabulary centroid (2/3, 2/3).
    let from_unknown = induce(&table, &induction, &["zzz"]).unwrap();
    let centroid = [2.0 / 3.0, 2.0 / 3.0];
    let expected = [
        centroid[0] * 5.0 / 14.0 + centroid[1] * 3.0 / 14.0,
        centroid[0] * -4.0 / 7.0 + centroid[1] * 6.0 / 7.0,
    ];
    assert!((from_unknown[0] - expected[0]).abs() < 1e-6);
    assert!((from_unknown[1] - expected[1]).abs() < 1e-6);

    let empty: [&str; 0] = [];
    assert!(induce(&table, &induction, &empty).is_err());
}

#[tokio::test]
async fn held_out_window_a_b_is_queried_against_c() {
    let table = table();
    let corpus = segment(Cursor::new("a b c\n\na b\n"), options())
        .await
        .unwrap();
    let counts = accumulate(&corpus, &table, 2).unwrap();
    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies).unwrap();

    // Context average (1/2, 1/2) through W.
    let induced = induce(&table, &induction, &["a", "b"]).unwrap();
    assert_eq!(induced.len(), 2);
    assert!((induced[0] - 2.0 / 7.0).abs() < EPS, "x = {}", induced[0]);
    assert!((induced[1] - 1.0 / 7.0).abs() < EPS, "y = {}", induced[1]);

    let c = table.embed("c").unwrap();
    let c: Vec<f64> = c.iter().map(|&v| v as f64).collect();
    let score = cosine_similarity(&induced, &c);
    assert!((score - 3.0 / 10.0_f64.sqrt()).abs() < EPS, "cosine {score}");
}
