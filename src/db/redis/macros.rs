/// Read-through caching for upstream responses.
///
/// `$cache` is an `Option<&Cache>`; with `None` the block is simply awaited.
/// A failed cache read is logged and treated as a miss so that a Redis outage
/// never fails a request that the upstream could still answer.
///
/// # Arguments
/// * `$cache`: `Option<&Cache>` to read from and write to.
/// * `$key`: the `CacheKey` for the value.
/// * `$ttl`: time-to-live in seconds for a freshly computed value.
/// * `$block`: future yielding `AppResult<T>`, awaited on a miss.
///
/// # Example
/// ```rust,ignore
/// let credits: serde_json::Value = cached!(self.cache.as_ref(), key, CREDITS_TTL, async move {
///     self.get_json(&path, &[]).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cache: Option<&$crate::db::Cache> = $cache;
        let key: $crate::db::CacheKey = $key;

        let hit = match cache {
            Some(cache) => cache.get_from_cache(&key).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                None
            }),
            None => None,
        };

        match hit {
            Some(value) => Ok(value),
            None => match $block.await {
                Ok(value) => {
                    if let Some(cache) = cache {
                        cache.set_in_background(&key, &value, $ttl);
                    }
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
