use blend::{BlendJob, CancelToken, JobRecord};
use criterion::{criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, Criterion};
use geo::geometry::Coord;
use gmtgrid::{
    create_sink, GridLocation, GridSink, GridSpec, MemoryGrid, ReadMode, Region, Registration,
};
use std::path::Path;

/// Four tiles overlapping by a quarter of their width, each tapered
/// across the overlap: (outer, inner).
const QUAD: [(&str, &str); 4] = [
    ("0/1.25/0/1.25", "0/1/0/1"),
    ("0.75/2/0/1.25", "1/2/0/1"),
    ("0/1.25/0.75/2", "0/1/1/2"),
    ("0.75/2/0.75/2", "1/2/1/2"),
];

#[allow(clippy::cast_precision_loss)]
fn tile(region: &str, inc: f64) -> MemoryGrid {
    let spec = GridSpec::new(
        region.parse().unwrap(),
        Coord { x: inc, y: inc },
        Registration::Gridline,
    )
    .unwrap();
    MemoryGrid::from_fn(spec, |col, row| (col * row) as f32)
}

/// Writes `grid` as a native float grid and returns its location.
fn tile_file(dir: &Path, name: &str, grid: &MemoryGrid) -> GridLocation {
    let path = dir.join(name);
    let mut sink = create_sink(&path, grid.header(), false).unwrap();
    for row in 0..grid.spec().n_rows() {
        sink.write_row(row, grid.row(row).unwrap()).unwrap();
    }
    sink.finish(0.0, 0.0).unwrap();
    GridLocation::file(&path).unwrap()
}

fn quad_job<I>(grids: I, read_mode: ReadMode) -> BlendJob
where
    I: IntoIterator<Item = GridLocation>,
{
    let records = grids
        .into_iter()
        .zip(QUAD)
        .map(|(grid, (_, inner))| JobRecord::new(grid).inner(inner.parse::<Region>().unwrap()));
    BlendJob::builder()
        .sources(records)
        .read_mode(read_mode)
        .build()
        .unwrap()
}

fn bench_job(group: &mut BenchmarkGroup<'_, WallTime>, name: &str, job: &BlendJob) {
    let cancel = CancelToken::new();
    group.bench_function(name, |b| {
        b.iter(|| {
            let mut out = MemoryGrid::new(job.output_header());
            job.run(&mut out, &cancel, |_| ()).unwrap()
        })
    });
}

fn blend_quad(c: &mut Criterion) {
    let mut group = c.benchmark_group("Blend");
    let dir = tempfile::tempdir().unwrap();

    for (name, inc) in [("quad 400x400", 0.005), ("quad 2000x2000", 0.001)] {
        let tiles: Vec<MemoryGrid> = QUAD.iter().map(|(outer, _)| tile(outer, inc)).collect();

        let job = quad_job(tiles.iter().cloned().map(GridLocation::memory), ReadMode::Stream);
        bench_job(&mut group, &format!("{name} memory"), &job);

        let files: Vec<GridLocation> = tiles
            .iter()
            .enumerate()
            .map(|(idx, grid)| tile_file(dir.path(), &format!("{name} {idx}.grd"), grid))
            .collect();
        for (mode_name, mode) in [("stream", ReadMode::Stream), ("mmap", ReadMode::MemMap)] {
            let job = quad_job(files.iter().cloned(), mode);
            bench_job(&mut group, &format!("{name} {mode_name}"), &job);
        }
    }
}

criterion_group!(benches, blend_quad);
criterion_main!(benches);
