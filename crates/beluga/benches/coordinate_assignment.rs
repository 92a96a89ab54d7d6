use beluga::{
    CoordinateOptions, HierarchyBuilder, HierarchyModel, LayoutRecorder, Size, assign_coordinates,
};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

#[derive(Debug, Clone)]
struct GridSpec {
    ranks: usize,
    width: usize,
}

impl GridSpec {
    fn id(rank: usize, i: usize) -> String {
        format!("r{rank}_n{i}")
    }

    fn build(&self) -> (HierarchyModel, LayoutRecorder) {
        let mut b = HierarchyBuilder::new();
        let mut recorder = LayoutRecorder::new();
        for rank in 0..self.ranks {
            for i in 0..self.width {
                let id = Self::id(rank, i);
                // Vary widths a little so the packing is not trivially uniform.
                let size = Size::new(40.0 + (i % 3) as f64 * 15.0, 30.0);
                recorder.set_bounds(id.clone(), size);
                b.add_vertex(id, rank).expect("unique vertex id");
            }
        }

        for rank in 1..self.ranks {
            for i in 0..self.width {
                let from = Self::id(rank, i);
                // Two crossing connections into the rank below.
                for (k, to) in [(i + 1) % self.width, (i * 7 + 3) % self.width]
                    .into_iter()
                    .enumerate()
                {
                    let to = Self::id(rank - 1, to);
                    b.connect(format!("e{rank}_{i}_{k}"), &from, &to)
                        .expect("layered edge");
                }
                // A long edge every few vertices.
                if i % 4 == 0 && rank >= 3 {
                    let to = Self::id(rank - 3, (i + 2) % self.width);
                    b.connect(format!("long{rank}_{i}"), &from, &to)
                        .expect("layered edge");
                }
            }
        }

        let model = b.build().expect("valid grid");
        (model, recorder)
    }
}

fn bench_assign_coordinates(c: &mut Criterion) {
    let mut group = c.benchmark_group("coordinate_assignment");
    group.measurement_time(Duration::from_secs(10));

    let cases = [
        ("grid_6x10", GridSpec { ranks: 6, width: 10 }),
        ("grid_12x25", GridSpec { ranks: 12, width: 25 }),
        ("grid_20x50", GridSpec { ranks: 20, width: 50 }),
    ];

    let options = CoordinateOptions::default();
    for (name, spec) in cases {
        group.bench_with_input(
            BenchmarkId::new("assign_coordinates", name),
            &spec,
            |b, spec| {
                b.iter_batched(
                    || spec.build(),
                    |(mut model, mut recorder)| {
                        let report =
                            assign_coordinates(black_box(&mut model), &options, &mut recorder);
                        black_box(report.limit_x);
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_assign_coordinates);
criterion_main!(benches);
