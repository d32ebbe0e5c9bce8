/// Read-through caching for an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background write with `$ttl` seconds, and returns it.
/// Both the cache read and the block propagate errors with `?`, so the macro must
/// be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let price: Option<AppPrice> = cached!(cache, key, PRICE_CACHE_TTL, async move {
///     fetch_from_store(appid).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.get_from_cache(&$key).await? {
            tracing::debug!(key = %$key, "Cache hit");
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
