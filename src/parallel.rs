use rayon::prelude::*;
use swiftcsv_core::{Chunk, Splitter, TokenizerBuilder};
use tracing::{debug, trace};

use crate::collect::{collect, run, strict_failure, Collector};
use crate::error::{Error, Result};

/// The smallest chunk worth handing to a worker.
pub const DEFAULT_MIN_CHUNK: usize = 64 * (1 << 10);

/// The most workers a single parse will use.
pub const MAX_THREADS: usize = 256;

/// Turn a requested worker count into an actual one.
///
/// `0` selects the available parallelism.
pub(crate) fn resolve_threads(threads: usize) -> usize {
    let threads = if threads == 0 {
        rayon::current_num_threads()
    } else {
        threads
    };
    threads.max(1).min(MAX_THREADS)
}

/// Tokenize `data` in chunks on a pool of `threads` workers, merging each
/// worker's collector in input order.
///
/// Workers run to completion independently. In strict mode every worker that
/// aborted contributes its error, and the merged errors are reported ordered
/// by line.
pub(crate) fn collect_parallel<C, F>(
    builder: &TokenizerBuilder,
    data: &[u8],
    threads: usize,
    min_chunk: usize,
    make: F,
) -> Result<C::Output>
where
    C: Collector,
    F: Fn() -> C + Sync,
{
    let threads = resolve_threads(threads);
    let mut splitter = Splitter::new(builder);
    splitter.min_chunk(min_chunk);
    let chunks = splitter.split(data, threads);
    debug!(
        threads = threads,
        chunks = chunks.len(),
        len = data.len(),
        "planned parallel parse"
    );
    if chunks.len() <= 1 {
        return collect(builder, data, make());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|err| Error::Resource(err.to_string()))?;
    let parts: Vec<(C, Option<_>)> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| {
                let mut collector = make();
                let b = chunk.builder(builder);
                let res = run(&b, slice(data, chunk), &mut collector);
                trace!(
                    start = chunk.start,
                    end = chunk.end,
                    first_line = chunk.first_line,
                    ok = res.is_ok(),
                    "worker finished chunk"
                );
                (collector, res.err())
            })
            .collect()
    });

    let mut failures = vec![];
    let mut merged: Option<C> = None;
    for (collector, failure) in parts {
        failures.extend(failure);
        match merged {
            None => merged = Some(collector),
            Some(ref mut m) => m.append(collector),
        }
    }
    if !failures.is_empty() {
        return Err(strict_failure(failures));
    }
    match merged {
        Some(m) => m.finish(),
        None => make().finish(),
    }
}

fn slice<'a>(data: &'a [u8], chunk: &Chunk) -> &'a [u8] {
    &data[chunk.start..chunk.end]
}
