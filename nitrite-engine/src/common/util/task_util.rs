use crate::errors::{ErrorKind, NitriteError, NitriteResult};

/// Runs `op` on a detached thread.
pub fn async_task<OP>(op: OP)
where
    OP: FnOnce() + Send + 'static,
{
    std::thread::spawn(op);
}

/// Applies `op` to every item on at most `width` scoped worker threads and
/// returns the results in input order.
///
/// Items are split into contiguous chunks, one chunk per worker. A single
/// item, or a width of one, runs on the caller's thread.
pub fn run_bounded<T, R, OP>(items: Vec<T>, width: usize, op: OP) -> Vec<NitriteResult<R>>
where
    T: Send,
    R: Send,
    OP: Fn(T) -> NitriteResult<R> + Sync,
{
    let width = width.max(1);
    if items.len() <= 1 || width == 1 {
        return items.into_iter().map(op).collect();
    }

    let chunk_size = items.len().div_ceil(width);
    let mut chunks: Vec<Vec<T>> = Vec::with_capacity(width);
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        chunks.push(items.by_ref().take(chunk_size).collect());
    }

    let op = &op;
    std::thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .map(|chunk| scope.spawn(move || chunk.into_iter().map(op).collect::<Vec<_>>()))
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            match handle.join() {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(_) => {
                    log::error!("Worker thread panicked");
                    results.push(Err(NitriteError::new(
                        "Worker thread panicked",
                        ErrorKind::InternalError,
                    )));
                }
            }
        }
        results
    })
}
