//! The filter stack of one document.
//!
//! A [`FilterStack`] owns the base image, the ordered stages applied to it,
//! the current composed image and the result cache. Previews evaluate a
//! hypothetical stack without touching the committed one; commits edit the
//! stack and recompute, consulting the cache by fingerprint.

use crate::core::config::StackOptions;
use crate::core::error::{FilterId, FilterResult};
use crate::core::filter::{FilterRequest, FilterSpec};
use crate::core::types::ImageValue;
use crate::filters::registry::SharedRegistry;
use crate::stack::cache::{CacheStats, StackCache};
use crate::stack::fingerprint::Fingerprint;
use crate::stack::replay::replay;
use std::fmt;

/// Whether a speculative edit is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackStatus {
    /// The current image reflects the committed stack.
    #[default]
    Clean,
    /// A preview has been produced since the last commit or cancel.
    Previewing,
}

type Observer = Box<dyn Fn() + Send + Sync>;

/// Ordered filter stages bound to a base image.
pub struct FilterStack {
    registry: SharedRegistry,
    options: StackOptions,
    base: ImageValue,
    image: ImageValue,
    filters: Vec<FilterSpec>,
    cache: StackCache,
    status: StackStatus,
    observers: Vec<Observer>,
}

impl FilterStack {
    /// Create an empty stack over `base`.
    pub fn new(registry: SharedRegistry, base: ImageValue) -> Self {
        Self {
            registry,
            options: StackOptions::default(),
            image: base.clone(),
            base,
            filters: Vec::new(),
            cache: StackCache::new(),
            status: StackStatus::Clean,
            observers: Vec::new(),
        }
    }

    /// Set stack options.
    pub fn with_options(mut self, options: StackOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a refresh callback. Callbacks carry no payload; consumers
    /// pull [`FilterStack::current_image`].
    pub fn on_refresh<F>(&mut self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observers.push(Box::new(callback));
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer();
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Replay every visible stage from the base image without the cache.
    pub fn apply_filter(&mut self) -> FilterResult<()> {
        let result = replay(&self.registry, &self.base, &self.filters)?;
        log::debug!(
            "replayed {} stages ({} hidden) in {:?}",
            result.applied,
            result.skipped,
            result.duration
        );
        self.image = result.image;
        self.notify();
        Ok(())
    }

    /// Recompute the current image, reusing a cached result for this exact
    /// configuration when one exists.
    pub fn apply_and_cache(&mut self) -> FilterResult<()> {
        if !self.options.use_cache {
            return self.apply_filter();
        }

        let key = Fingerprint::of(&self.filters);

        if let Some(image) = self.cache.get(&key) {
            log::debug!("cache hit for {}", key.short());
            self.image = image;
        } else {
            let result = replay(&self.registry, &self.base, &self.filters)?;
            log::debug!("cache miss for {}, replayed in {:?}", key.short(), result.duration);
            self.cache.insert(key, result.image.clone(), result.duration);
            self.image = result.image;
        }
        self.cache.record(key, &self.filters);

        self.notify();
        Ok(())
    }

    /// Evaluate the stack as it would be with `request` applied, without
    /// committing anything.
    ///
    /// A request for a filter already in the stack substitutes its parameters
    /// in place; any other request is evaluated as appended. A failed preview
    /// leaves the status, the stack and the cache entries as they were.
    pub fn preview_filter(&mut self, request: &FilterRequest) -> FilterResult<ImageValue> {
        let hypothetical = self.hypothetical(request)?;

        let image = if self.options.use_cache {
            let key = Fingerprint::of(&hypothetical);
            let image = match self.cache.get(&key) {
                Some(image) => {
                    log::trace!("preview hit for {}", key.short());
                    image
                }
                None => {
                    let result = replay(&self.registry, &self.base, &hypothetical)?;
                    log::trace!("preview miss for {}, replayed in {:?}", key.short(), result.duration);
                    self.cache.insert(key, result.image.clone(), result.duration);
                    result.image
                }
            };
            self.cache.record(key, &hypothetical);
            image
        } else {
            replay(&self.registry, &self.base, &hypothetical)?.image
        };

        self.status = StackStatus::Previewing;
        Ok(image)
    }

    /// The stack `add_filter` would commit for `request`.
    ///
    /// An existing stage only takes the new parameters; its kind, signal and
    /// visibility stay as committed.
    fn hypothetical(&self, request: &FilterRequest) -> FilterResult<Vec<FilterSpec>> {
        let mut specs = self.filters.clone();
        match specs.iter_mut().find(|s| s.identifier == request.identifier) {
            Some(existing) => existing.parameter = request.parameter.clone(),
            None => specs.push(FilterSpec::try_from(request)?),
        }
        Ok(specs)
    }

    /// Drop the speculative state and re-signal the committed image.
    pub fn cancel_preview(&mut self) {
        self.status = StackStatus::Clean;
        self.notify();
    }

    // ========================================================================
    // Commits
    // ========================================================================

    /// Apply `edit` to the stage list and recompute. If recomputation fails
    /// the stage list is restored and the current image is left as it was.
    fn commit<F>(&mut self, cached: bool, edit: F) -> FilterResult<()>
    where
        F: FnOnce(&mut Vec<FilterSpec>),
    {
        let snapshot = self.filters.clone();
        edit(&mut self.filters);

        let result = if cached {
            self.apply_and_cache()
        } else {
            self.apply_filter()
        };

        if let Err(ref error) = result {
            log::warn!("recompute failed, restoring previous stack: {}", error);
            self.filters = snapshot;
        }
        self.status = StackStatus::Clean;
        result
    }

    /// Commit a dialog's parameters.
    ///
    /// For a filter already in the stack only its parameters change; anything
    /// else is appended as a new visible stage.
    pub fn add_filter(&mut self, request: &FilterRequest) -> FilterResult<()> {
        if let Some(index) = self.position(&request.identifier) {
            let parameter = request.parameter.clone();
            return self.commit(true, |filters| filters[index].parameter = parameter);
        }

        let spec = FilterSpec::try_from(request)?;
        log::info!("adding {}/{} ({})", spec.library, spec.name, spec.identifier);
        self.commit(true, |filters| filters.push(spec))
    }

    /// Remove a filter and every cached result it took part in.
    ///
    /// Eviction also covers identifiers only ever seen in previews. An
    /// identifier that is not in the stack causes no recompute.
    pub fn remove_filter(&mut self, identifier: &FilterId) -> FilterResult<()> {
        self.cache.evict_filter(identifier);

        let Some(index) = self.position(identifier) else {
            self.status = StackStatus::Clean;
            return Ok(());
        };
        log::info!("removing {}", identifier);
        self.commit(true, |filters| {
            filters.remove(index);
        })
    }

    /// Flip a stage's visibility. Unknown identifiers are ignored.
    pub fn toggle_visibility(&mut self, identifier: &FilterId) -> FilterResult<()> {
        match self.position(identifier) {
            Some(index) => self.commit(true, |filters| filters[index].visible = !filters[index].visible),
            None => Ok(()),
        }
    }

    /// Replace a stage's parameters. Unknown identifiers are ignored.
    pub fn update_filter(&mut self, request: &FilterRequest) -> FilterResult<()> {
        match self.position(&request.identifier) {
            Some(index) => {
                let parameter = request.parameter.clone();
                self.commit(true, |filters| filters[index].parameter = parameter)
            }
            None => Ok(()),
        }
    }

    /// Swap the stage at `row` with the one above it.
    ///
    /// Returns the new row, or `None` when there is nothing to swap with.
    pub fn move_up(&mut self, row: usize) -> FilterResult<Option<usize>> {
        if row == 0 || row >= self.filters.len() {
            return Ok(None);
        }
        self.swap(row, row - 1)
    }

    /// Swap the stage at `row` with the one below it.
    ///
    /// Returns the new row, or `None` when there is nothing to swap with.
    pub fn move_down(&mut self, row: usize) -> FilterResult<Option<usize>> {
        match row.checked_add(1).filter(|&target| target < self.filters.len()) {
            Some(target) => self.swap(row, target),
            None => Ok(None),
        }
    }

    fn swap(&mut self, row: usize, target: usize) -> FilterResult<Option<usize>> {
        let cached = self.options.cache_reorders;
        self.commit(cached, |filters| filters.swap(row, target))?;
        Ok(Some(target))
    }

    /// Drop a cached result that is suspected to be wrong.
    pub fn invalidate(&mut self, key: &Fingerprint) -> bool {
        self.cache.invalidate(key)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The image for the committed stack.
    pub fn current_image(&self) -> &ImageValue {
        &self.image
    }

    /// The untouched base image.
    pub fn base_image(&self) -> &ImageValue {
        &self.base
    }

    /// Committed stages in application order.
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Find a stage by identifier.
    pub fn get(&self, identifier: &FilterId) -> Option<&FilterSpec> {
        self.filters.iter().find(|s| &s.identifier == identifier)
    }

    /// Row of a stage.
    pub fn position(&self, identifier: &FilterId) -> Option<usize> {
        self.filters.iter().position(|s| &s.identifier == identifier)
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the stack has no stages.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Preview state.
    pub fn status(&self) -> StackStatus {
        self.status
    }

    /// Fingerprint of the committed configuration.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.filters)
    }

    /// Options in effect.
    pub fn options(&self) -> &StackOptions {
        &self.options
    }

    /// The result cache.
    pub fn cache(&self) -> &StackCache {
        &self.cache
    }

    /// Cache statistics.
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Number of cached results.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl fmt::Debug for FilterStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStack")
            .field("options", &self.options)
            .field("base", &self.base)
            .field("filters", &self.filters)
            .field("status", &self.status)
            .field("cached", &self.cache.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FilterError;
    use crate::core::types::{Library, Parameters};
    use crate::filters::registry::FilterRegistry;
    use image::{DynamicImage, GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn stack() -> FilterStack {
        let base = ImageValue::new(DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([100]))));
        FilterStack::new(FilterRegistry::with_builtins().into_shared(), base)
    }

    fn brightness(id: &str, amount: i64) -> FilterRequest {
        FilterRequest::new(Library::OpenCv, "brightness", Parameters::new().with("amount", amount)).with_identifier(id)
    }

    fn pixel(stack: &FilterStack) -> u8 {
        stack.current_image().as_bytes()[0]
    }

    #[test]
    fn test_new_stack_shows_base() {
        let stack = stack();
        assert!(stack.is_empty());
        assert_eq!(stack.current_image(), stack.base_image());
        assert_eq!(stack.status(), StackStatus::Clean);
    }

    #[test]
    fn test_add_then_edit_keeps_identity() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        assert_eq!(pixel(&stack), 110);

        stack.add_filter(&brightness("a", 30)).unwrap();
        assert_eq!(stack.len(), 1);
        assert_eq!(pixel(&stack), 130);
        assert_eq!(stack.filters()[0].identifier, FilterId::from("a"));
    }

    #[test]
    fn test_preview_does_not_commit() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();

        let preview = stack.preview_filter(&brightness("a", 50)).unwrap();
        assert_eq!(preview.as_bytes()[0], 150);
        assert_eq!(pixel(&stack), 110);
        assert_eq!(stack.get(&FilterId::from("a")).unwrap().parameter.get("amount"), Some(&10.into()));
        assert_eq!(stack.status(), StackStatus::Previewing);

        stack.cancel_preview();
        assert_eq!(stack.status(), StackStatus::Clean);
        assert_eq!(pixel(&stack), 110);
    }

    #[test]
    fn test_preview_under_existing_id_matches_commit() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();

        let other_kind =
            FilterRequest::new(Library::OpenCv, "median", Parameters::new().with("amount", 40)).with_identifier("a");
        let preview = stack.preview_filter(&other_kind).unwrap();
        stack.add_filter(&other_kind).unwrap();

        assert_eq!(stack.filters()[0].name, "brightness");
        assert_eq!(pixel(&stack), 140);
        assert_eq!(stack.current_image(), &preview);
        let fresh = replay(&FilterRegistry::with_builtins(), stack.base_image(), stack.filters()).unwrap();
        assert_eq!(stack.current_image(), &fresh.image);
    }

    #[test]
    fn test_preview_keeps_hidden_stage_hidden() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        stack.toggle_visibility(&FilterId::from("a")).unwrap();

        let preview = stack.preview_filter(&brightness("a", 50)).unwrap();
        assert_eq!(preview.as_bytes()[0], 100);
    }

    #[test]
    fn test_failed_preview_changes_nothing() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        let entries = stack.cache_len();

        let bad = FilterRequest::new(Library::OpenCv, "gaussian", Parameters::new().with("kernel_size", "wide"))
            .with_identifier("g");
        assert!(stack.preview_filter(&bad).is_err());
        let unknown = FilterRequest::new(Library::Scikit, "warp_polar", Parameters::new()).with_identifier("w");
        assert!(stack.preview_filter(&unknown).is_err());

        assert_eq!(stack.status(), StackStatus::Clean);
        assert_eq!(stack.len(), 1);
        assert_eq!(pixel(&stack), 110);
        assert_eq!(stack.cache_len(), entries);
        assert!(stack.cache().keys_for(&FilterId::from("g")).is_none());
        assert!(stack.cache().keys_for(&FilterId::from("w")).is_none());
    }

    #[test]
    fn test_move_down_last_possible_row() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        assert_eq!(stack.move_down(usize::MAX).unwrap(), None);
        assert_eq!(stack.move_up(usize::MAX).unwrap(), None);
        assert_eq!(pixel(&stack), 110);
    }

    #[test]
    fn test_toggle_hides_stage() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        stack.add_filter(&brightness("b", 5)).unwrap();

        stack.toggle_visibility(&FilterId::from("a")).unwrap();
        assert_eq!(pixel(&stack), 105);

        stack.toggle_visibility(&FilterId::from("a")).unwrap();
        assert_eq!(pixel(&stack), 115);
        assert!(stack.cache_stats().hits >= 1);
    }

    #[test]
    fn test_unknown_identifiers_are_ignored() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();
        let before = stack.cache_stats().clone();

        stack.toggle_visibility(&FilterId::from("ghost")).unwrap();
        stack.update_filter(&brightness("ghost", 99)).unwrap();
        stack.remove_filter(&FilterId::from("ghost")).unwrap();

        assert_eq!(stack.len(), 1);
        assert_eq!(pixel(&stack), 110);
        assert_eq!(stack.cache_stats(), &before);
    }

    #[test]
    fn test_moves_at_bounds_are_noops() {
        let mut stack = stack();
        assert_eq!(stack.move_up(0).unwrap(), None);
        assert_eq!(stack.move_down(0).unwrap(), None);

        stack.add_filter(&brightness("a", 10)).unwrap();
        stack.add_filter(&brightness("b", 5)).unwrap();
        assert_eq!(stack.move_up(0).unwrap(), None);
        assert_eq!(stack.move_down(1).unwrap(), None);
        assert_eq!(stack.move_up(7).unwrap(), None);

        assert_eq!(stack.move_down(0).unwrap(), Some(1));
        assert_eq!(stack.filters()[0].identifier, FilterId::from("b"));
    }

    #[test]
    fn test_failed_commit_restores_stack() {
        let mut stack = stack();
        stack.add_filter(&brightness("a", 10)).unwrap();

        let bad = FilterRequest::new(Library::OpenCv, "gaussian", Parameters::new().with("kernel_size", "wide"))
            .with_identifier("g");
        let error = stack.add_filter(&bad).unwrap_err();
        assert!(matches!(error, FilterError::InvalidParameter { .. }));

        assert_eq!(stack.len(), 1);
        assert_eq!(pixel(&stack), 110);
        assert_eq!(stack.status(), StackStatus::Clean);
    }

    #[test]
    fn test_unknown_library_is_rejected() {
        let mut stack = stack();
        let mut request = brightness("a", 10);
        request.library = "matlab".to_string();

        assert_eq!(
            stack.add_filter(&request).unwrap_err(),
            FilterError::UnknownLibrary("matlab".to_string())
        );
        assert!(stack.is_empty());
    }

    #[test]
    fn test_observers_fire_on_every_refresh() {
        let mut stack = stack();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        stack.on_refresh(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        stack.add_filter(&brightness("a", 10)).unwrap();
        stack.preview_filter(&brightness("a", 20)).unwrap();
        stack.cancel_preview();
        stack.apply_filter().unwrap();

        // Previews do not refresh; commits, cancels and replays do.
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_without_cache_nothing_is_stored() {
        let mut stack = stack().with_options(StackOptions::new().with_cache(false));
        stack.add_filter(&brightness("a", 10)).unwrap();
        stack.preview_filter(&brightness("a", 20)).unwrap();
        assert_eq!(stack.cache_len(), 0);
        assert_eq!(pixel(&stack), 110);
    }
}
