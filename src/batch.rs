//! Per-path work units over a batch.
//!
//! Batch elements are independent, so each one is handed its own disjoint
//! chunks of the output buffers. With the `rayon` feature the chunks are
//! processed in parallel; otherwise sequentially, in batch order.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Calls `f(batch_index, chunk)` for every `chunk`-sized piece of `out`.
pub(crate) fn for_each_batch<F>(out: &mut [f64], chunk: usize, f: F)
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    debug_assert!(chunk > 0, "batch chunk must be non-empty");

    #[cfg(feature = "rayon")]
    out.par_chunks_mut(chunk)
        .enumerate()
        .for_each(|(b, piece)| f(b, piece));

    #[cfg(not(feature = "rayon"))]
    out.chunks_mut(chunk)
        .enumerate()
        .for_each(|(b, piece)| f(b, piece));
}

/// Like [`for_each_batch`], walking two buffers in lockstep.
pub(crate) fn for_each_batch_pair<F>(
    first: &mut [f64],
    first_chunk: usize,
    second: &mut [f64],
    second_chunk: usize,
    f: F,
) where
    F: Fn(usize, &mut [f64], &mut [f64]) + Sync + Send,
{
    debug_assert!(first_chunk > 0 && second_chunk > 0, "batch chunks must be non-empty");

    #[cfg(feature = "rayon")]
    first
        .par_chunks_mut(first_chunk)
        .zip(second.par_chunks_mut(second_chunk))
        .enumerate()
        .for_each(|(b, (x, y))| f(b, x, y));

    #[cfg(not(feature = "rayon"))]
    first
        .chunks_mut(first_chunk)
        .zip(second.chunks_mut(second_chunk))
        .enumerate()
        .for_each(|(b, (x, y))| f(b, x, y));
}
