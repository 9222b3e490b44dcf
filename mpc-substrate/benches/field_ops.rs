use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mpc_substrate::field::{FieldElement, FieldMatrix, FieldVector};

fn bench_element(c: &mut Criterion) {
    let mut rng = rand::rng();
    let a = FieldElement::random(&mut rng);
    let b = FieldElement::random(&mut rng);

    c.bench_function("element mul", |bench| {
        bench.iter(|| black_box(&a).mul(black_box(&b)))
    });
    c.bench_function("element inv", |bench| {
        bench.iter(|| black_box(&a).inv().expect("random element is non-zero"))
    });
}

fn bench_vector(c: &mut Criterion) {
    let mut rng = rand::rng();
    let mut group = c.benchmark_group("Vector");

    for len in [16usize, 1_024, 65_536] {
        let x = FieldVector::random(len, &mut rng);
        let y = FieldVector::random(len, &mut rng);
        let encoded = x.to_bytes();

        group.bench_with_input(BenchmarkId::new("add", len), &(&x, &y), |b, (x, y)| {
            b.iter(|| x.add(black_box(y)).expect("same length"))
        });
        group.bench_with_input(BenchmarkId::new("dot", len), &(&x, &y), |b, (x, y)| {
            b.iter(|| x.dot(black_box(y)).expect("same length"))
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &encoded, |b, bytes| {
            b.iter(|| FieldVector::from_bytes(black_box(bytes)).expect("decode"))
        });
    }

    group.finish();
}

fn bench_matrix(c: &mut Criterion) {
    let mut rng = rand::rng();
    let m = FieldMatrix::random(64, 64, &mut rng);
    let n = FieldMatrix::random(64, 64, &mut rng);

    c.bench_function("matrix mat_mul 64x64", |b| {
        b.iter(|| m.mat_mul(black_box(&n)).expect("square"))
    });
}

criterion_group!(benches, bench_element, bench_vector, bench_matrix);
criterion_main!(benches);
