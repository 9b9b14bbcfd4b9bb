//! Property tests over randomly generated stacks.

use filterstack::prelude::*;
use image::{DynamicImage, GrayImage, Luma};
use proptest::prelude::*;

fn base() -> ImageValue {
    let image = GrayImage::from_fn(16, 12, |x, y| Luma([(x * 13 + y * 29) as u8]));
    ImageValue::new(DynamicImage::ImageLuma8(image))
}

fn registry() -> SharedRegistry {
    FilterRegistry::with_builtins().into_shared()
}

/// A cheap stage drawn from a handful of filter kinds.
fn stage() -> impl Strategy<Value = (Library, &'static str, Parameters)> {
    prop_oneof![
        (-60i64..60).prop_map(|amount| (Library::OpenCv, "brightness", Parameters::new().with("amount", amount))),
        (0i64..3).prop_map(|k| (Library::OpenCv, "median", Parameters::new().with("kernel_size", 2 * k + 1))),
        (1i64..4).prop_map(|k| (Library::OpenCv, "gaussian", Parameters::new().with("kernel_size", 2 * k + 1))),
        (0i64..255).prop_map(|level| (Library::OpenCv, "threshold", Parameters::new().with("threshold", level))),
        (0.5f64..2.0).prop_map(|gamma| (Library::Scikit, "brightness", Parameters::new().with("gamma", gamma))),
        Just((Library::Scikit, "sobel", Parameters::new())),
        Just((Library::OpenCv, "laplacian", Parameters::new())),
    ]
}

fn specs() -> impl Strategy<Value = Vec<FilterSpec>> {
    prop::collection::vec((stage(), any::<bool>()), 0..5).prop_map(|stages| {
        stages
            .into_iter()
            .enumerate()
            .map(|(i, ((library, name, parameter), visible))| {
                let mut spec = FilterSpec::new(library, name, parameter);
                spec.identifier = FilterId::from(format!("stage-{}", i).as_str());
                spec.visible = visible;
                spec
            })
            .collect()
    })
}

fn build(specs: &[FilterSpec]) -> FilterStack {
    let mut stack = FilterStack::new(registry(), base());
    for spec in specs {
        let request = FilterRequest::new(spec.library, spec.name.clone(), spec.parameter.clone())
            .with_identifier(spec.identifier.clone());
        stack.add_filter(&request).unwrap();
        if !spec.visible {
            stack.toggle_visibility(&spec.identifier).unwrap();
        }
    }
    stack
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn replay_is_deterministic(specs in specs()) {
        let registry = registry();
        let first = replay(&registry, &base(), &specs).unwrap();
        let second = replay(&registry, &base(), &specs).unwrap();
        prop_assert_eq!(first.image.as_bytes(), second.image.as_bytes());
    }

    #[test]
    fn cached_result_equals_fresh_replay(specs in specs()) {
        let mut stack = build(&specs);
        prop_assert_eq!(stack.filters(), specs.as_slice());

        let fresh = replay(&registry(), stack.base_image(), stack.filters()).unwrap();
        prop_assert_eq!(stack.current_image(), &fresh.image);

        // Once stored, recomputing the same configuration comes from the cache.
        stack.apply_and_cache().unwrap();
        let hits = stack.cache_stats().hits;
        stack.apply_and_cache().unwrap();
        prop_assert_eq!(stack.cache_stats().hits, hits + 1);
        prop_assert_eq!(stack.current_image(), &fresh.image);
    }

    #[test]
    fn invisible_stage_is_like_a_removed_one(specs in specs(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!specs.is_empty());
        let index = pick.index(specs.len());

        let mut hidden = specs.clone();
        hidden[index].visible = false;
        let mut removed = specs.clone();
        removed.remove(index);

        let registry = registry();
        let a = replay(&registry, &base(), &hidden).unwrap();
        let b = replay(&registry, &base(), &removed).unwrap();
        prop_assert_eq!(a.image, b.image);
    }

    #[test]
    fn toggling_twice_restores_the_output(specs in specs(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!specs.is_empty());
        let mut stack = build(&specs);
        let before = stack.current_image().clone();
        let identifier = specs[pick.index(specs.len())].identifier.clone();

        stack.toggle_visibility(&identifier).unwrap();
        stack.toggle_visibility(&identifier).unwrap();
        prop_assert_eq!(stack.current_image(), &before);
    }

    #[test]
    fn repeated_add_never_duplicates(first in -60i64..60, second in -60i64..60) {
        let mut stack = FilterStack::new(registry(), base());
        let request = |amount: i64| {
            FilterRequest::new(Library::OpenCv, "brightness", Parameters::new().with("amount", amount))
                .with_identifier("same")
        };

        stack.add_filter(&request(first)).unwrap();
        stack.add_filter(&request(second)).unwrap();

        prop_assert_eq!(stack.len(), 1);
        prop_assert_eq!(
            stack.filters()[0].parameter.get("amount"),
            Some(&ParamValue::Integer(second))
        );
    }

    #[test]
    fn fingerprint_ignores_parameter_insertion_order(a in -100i64..100, b in 0.0f64..10.0) {
        let mut forward = Parameters::new();
        forward.insert("amount", a);
        forward.insert("sigma", b);
        let mut backward = Parameters::new();
        backward.insert("sigma", b);
        backward.insert("amount", a);

        let mut x = FilterSpec::new(Library::OpenCv, "gaussian", forward);
        x.identifier = FilterId::from("g");
        let mut y = FilterSpec::new(Library::OpenCv, "gaussian", backward);
        y.identifier = FilterId::from("g");

        prop_assert_eq!(Fingerprint::of(&[x]), Fingerprint::of(&[y]));
    }

    #[test]
    fn fingerprint_is_order_sensitive(specs in specs()) {
        prop_assume!(specs.len() >= 2);
        let mut swapped = specs.clone();
        swapped.swap(0, 1);
        prop_assert_ne!(Fingerprint::of(&specs), Fingerprint::of(&swapped));
    }
}
