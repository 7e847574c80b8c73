use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use regress_pipeline::training::{GridSearch, ModelKind, ParamSet, Regressor};

fn create_regression_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    let y = Array1::from_shape_fn(n_rows, |i| x.row(i).sum() + rng.gen::<f64>() * 0.1);
    (x, y)
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);
    let (x, y) = create_regression_data(1000, 10);

    for kind in [
        ModelKind::LinearRegression,
        ModelKind::DecisionTree,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
    ] {
        group.bench_with_input(BenchmarkId::new("default", kind.name()), &kind, |b, kind| {
            b.iter(|| {
                let mut model = kind.build(&ParamSet::new(), 42).unwrap();
                model.fit(black_box(&x), black_box(&y)).unwrap();
                model
            })
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    for n_rows in [500, 2000] {
        let (x, y) = create_regression_data(n_rows, 8);
        group.bench_with_input(BenchmarkId::new("ridge", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                GridSearch::new(ModelKind::Ridge, ModelKind::Ridge.default_grid())
                    .with_cv_folds(3)
                    .fit(black_box(x), black_box(y))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");
    let (x, y) = create_regression_data(2000, 10);
    let mut model = ModelKind::RandomForest.build(&ParamSet::new(), 42).unwrap();
    model.fit(&x, &y).unwrap();

    for batch in [1, 100, 1000] {
        let (test_x, _) = create_regression_data(batch, 10);
        group.bench_with_input(BenchmarkId::new("random_forest", batch), &test_x, |b, test_x| {
            b.iter(|| model.predict(black_box(test_x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_grid_search, bench_prediction);
criterion_main!(benches);
