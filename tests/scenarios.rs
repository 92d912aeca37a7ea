//! End-to-end splitting scenarios

use pagesplit_lib::graph::{Entry, Loading, Module, ModuleGraph, ModuleKind};
use pagesplit_lib::split::{
    BudgetCause, CacheGroup, Candidate, ChunkKind, ChunkManifest, ChunkNaming, ChunkSplitter,
    DuplicationCause, GroupPolicy, ModuleTest, PageScope, PredicateError, SplitOptions, SplitWarning,
};
use pagesplit_lib::SplitError;
use pretty_assertions::assert_eq;

const PAGES: [&str; 3] = ["home", "map", "sharedparkinglot-map"];

fn main_js(page: &str) -> String {
    format!("./src/pages/{}/main.js", page)
}

fn pages() -> Vec<Entry> {
    PAGES.iter().map(|page| Entry::new(*page, [main_js(page)])).collect()
}

fn split(modules: Vec<Module>, entries: Vec<Entry>, options: SplitOptions) -> ChunkManifest {
    let graph = ModuleGraph::from_modules(modules).unwrap();
    ChunkSplitter::new(entries, options).unwrap().split(&graph).unwrap()
}

fn names(manifest: &ChunkManifest, entry: &str) -> Vec<String> {
    manifest
        .chunks_for_entry(entry)
        .iter()
        .map(|chunk| chunk.name.clone())
        .collect()
}

/// Every page imports the same 25 kB helper
fn shared_helper_graph() -> Vec<Module> {
    let mut modules: Vec<Module> = PAGES
        .iter()
        .map(|page| {
            Module::script(main_js(page), 4_000)
                .issued_by_entry(*page)
                .depends_on(["./src/common/api.js"])
        })
        .collect();
    modules.push(Module::script("./src/common/api.js", 25_000).issued_by(main_js("home")));
    modules
}

#[test]
fn test_module_shared_by_all_pages_is_extracted_once() {
    let manifest = split(shared_helper_graph(), pages(), SplitOptions::default());

    assert_eq!(manifest.chunks.len(), 4);
    let holders = manifest.chunks_containing("./src/common/api.js");
    assert_eq!(holders.len(), 1);

    let shared = holders[0];
    assert_eq!(shared.kind, ChunkKind::Shared);
    assert_eq!(shared.group.as_deref(), Some("default"));
    assert_eq!(shared.name, "common-0");
    assert_eq!(shared.size, 25_000);
    assert_eq!(shared.required_by, vec!["home", "map", "sharedparkinglot-map"]);
    assert!(shared.file_name.starts_with("common-0/"));
    assert!(shared.file_name.ends_with(".js"));

    for page in PAGES {
        let entry = manifest.entry_chunk(page).unwrap();
        assert_eq!(entry.dependencies, vec![shared.id]);
        assert_eq!(entry.members, vec![main_js(page)]);
        assert_eq!(names(&manifest, page), vec!["common-0".to_string(), page.to_string()]);
    }
    assert!(manifest.duplicated.is_empty());
    assert!(manifest.warnings.is_empty());
}

#[test]
fn test_page_only_style_gets_its_own_named_chunk() {
    let modules = vec![
        Module::script(main_js("home"), 4_000).issued_by_entry("home"),
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/pages/map/map.css"]),
        Module::style("./src/pages/map/map.css", 1_200).issued_by(main_js("map")),
    ];
    let entries = vec![Entry::new("home", [main_js("home")]), Entry::new("map", [main_js("map")])];
    let options = SplitOptions {
        cache_groups: vec![
            CacheGroup::page_styles("mapStyles", "map"),
            CacheGroup::default_vendors(),
            CacheGroup::default_shared(),
        ],
        ..SplitOptions::default()
    };

    let manifest = split(modules, entries, options);

    let styles: Vec<_> = manifest
        .chunks_named("map")
        .filter(|chunk| chunk.kind == ChunkKind::Page)
        .collect();
    assert_eq!(styles.len(), 1);
    assert_eq!(styles[0].members, vec!["./src/pages/map/map.css"]);
    assert_eq!(styles[0].group.as_deref(), Some("mapStyles"));
    assert!(styles[0].file_name.starts_with("map/"));
    assert!(styles[0].file_name.ends_with(".css"));

    // enforced chunks survive min_size
    assert!(styles[0].size < 20_000);
    assert_eq!(manifest.entry_chunk("map").unwrap().dependencies, vec![styles[0].id]);
    assert!(manifest.entry_chunk("home").unwrap().dependencies.is_empty());
}

#[test]
fn test_same_named_styles_on_disjoint_paths_stay_separate() {
    let modules = vec![
        Module::script(main_js("home"), 4_000)
            .issued_by_entry("home")
            .depends_on(["./src/pages/home/style.css"]),
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/pages/map/style.css"]),
        Module::style("./src/pages/home/style.css", 800).issued_by(main_js("home")),
        Module::style("./src/pages/map/style.css", 900).issued_by(main_js("map")),
    ];
    let entries = vec![Entry::new("home", [main_js("home")]), Entry::new("map", [main_js("map")])];
    let page_styles = CacheGroup::new("pageStyles", ModuleTest::kind(ModuleKind::Style))
        .scope(PageScope::EachOwner)
        .enforce(true);
    let options = SplitOptions {
        cache_groups: vec![page_styles],
        ..SplitOptions::default()
    };

    let manifest = split(modules, entries, options);

    let pages: Vec<_> = manifest
        .chunks
        .iter()
        .filter(|chunk| chunk.kind == ChunkKind::Page)
        .collect();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].name, "home");
    assert_eq!(pages[0].members, vec!["./src/pages/home/style.css"]);
    assert_eq!(pages[1].name, "map");
    assert_eq!(pages[1].members, vec!["./src/pages/map/style.css"]);
    assert_ne!(pages[0].file_name, pages[1].file_name);
}

#[test]
fn test_style_behind_shared_script_belongs_to_first_importer() {
    let modules = vec![
        Module::script(main_js("home"), 4_000)
            .issued_by_entry("home")
            .depends_on(["./src/common/shared.js"]),
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/common/shared.js"]),
        Module::script("./src/common/shared.js", 30_000)
            .issued_by(main_js("map"))
            .issued_by(main_js("home"))
            .depends_on(["./src/common/x.css"]),
        Module::style("./src/common/x.css", 2_000).issued_by("./src/common/shared.js"),
    ];
    let entries = vec![Entry::new("home", [main_js("home")]), Entry::new("map", [main_js("map")])];
    let options = SplitOptions {
        cache_groups: vec![
            CacheGroup::page_styles("homeStyles", "home"),
            CacheGroup::page_styles("mapStyles", "map"),
            CacheGroup::default_shared(),
        ],
        ..SplitOptions::default()
    };

    let graph = ModuleGraph::from_modules(modules).unwrap();
    let splitter = ChunkSplitter::new(entries, options).unwrap();

    let reports = splitter.explain(&graph).unwrap();
    let css = reports.iter().find(|r| r.module == "./src/common/x.css").unwrap();
    assert_eq!(css.owner.as_deref(), Some("map"));
    assert_eq!(css.group.as_deref(), Some("mapStyles"));

    let manifest = splitter.split(&graph).unwrap();
    let holders = manifest.chunks_containing("./src/common/x.css");
    assert_eq!(holders.len(), 1);
    let styles = holders[0];
    assert_eq!(styles.kind, ChunkKind::Page);
    assert_eq!(styles.name, "map");
    assert_eq!(styles.members, vec!["./src/common/x.css"]);
    assert_eq!(styles.required_by, vec!["home", "map"]);
    assert!(manifest.chunks_named("home").all(|chunk| chunk.kind == ChunkKind::Entry));

    for page in ["home", "map"] {
        let entry = manifest.entry_chunk(page).unwrap();
        assert!(entry.dependencies.contains(&styles.id), "{} does not load map styles", page);
    }
}

#[test]
fn test_shared_code_reuses_vendor_chunk_of_same_pages() {
    let modules = vec![
        Module::script("./home.js", 1_000)
            .issued_by_entry("home")
            .depends_on(["./node_modules/react/index.js", "./util.js"]),
        Module::script("./map.js", 1_000)
            .issued_by_entry("map")
            .depends_on(["./node_modules/react/index.js", "./util.js"]),
        Module::script("./node_modules/react/index.js", 25_000).issued_by("./home.js"),
        Module::script("./util.js", 10_000).issued_by("./home.js"),
    ];
    let entries = vec![Entry::new("home", ["./home.js"]), Entry::new("map", ["./map.js"])];

    let manifest = split(modules.clone(), entries.clone(), SplitOptions::default());
    let holders = manifest.chunks_containing("./util.js");
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].group.as_deref(), Some("defaultVendors"));
    assert_eq!(holders[0].members, vec!["./node_modules/react/index.js", "./util.js"]);
    assert_eq!(names(&manifest, "home"), vec!["common-0".to_string(), "home".to_string()]);
    assert!(manifest.duplicated.is_empty());

    // on its own the helper is too small and is copied into both pages
    let options = SplitOptions {
        cache_groups: vec![
            CacheGroup::default_vendors(),
            CacheGroup::default_shared().reuse_existing_chunk(false),
        ],
        ..SplitOptions::default()
    };
    let manifest = split(modules, entries, options);
    assert_eq!(manifest.chunks_containing("./util.js").len(), 2);
    assert_eq!(manifest.duplicated[0].cause, DuplicationCause::Undersized);
}

#[test]
fn test_synthetic_names_avoid_declared_names() {
    let modules = vec![
        Module::script("./common.js", 1_000)
            .issued_by_entry("common-0")
            .depends_on(["./util.js"]),
        Module::script("./map.js", 1_000)
            .issued_by_entry("map")
            .depends_on(["./util.js"]),
        Module::script("./util.js", 30_000).issued_by("./common.js"),
    ];
    let entries = vec![Entry::new("common-0", ["./common.js"]), Entry::new("map", ["./map.js"])];

    let manifest = split(modules, entries, SplitOptions::default());
    let shared = manifest.chunks_containing("./util.js");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].name, "common-1");
    assert_eq!(manifest.chunks_named("common-0").count(), 1);
}

#[test]
fn test_automatic_names_avoid_declared_names() {
    let modules = vec![
        Module::script("./home.js", 1_000)
            .issued_by_entry("home")
            .depends_on(["./util.js"]),
        Module::script("./map.js", 1_000)
            .issued_by_entry("map")
            .depends_on(["./util.js"]),
        Module::script("./util.js", 30_000).issued_by("./home.js"),
    ];
    let entries = vec![Entry::new("home", ["./home.js"]), Entry::new("map", ["./map.js"])];
    let fixed = CacheGroup::new("fixed", |_: &Candidate<'_>| -> Result<bool, PredicateError> { Ok(false) })
        .chunk_name("default~home~map");
    let mut options = SplitOptions {
        cache_groups: vec![fixed, CacheGroup::default_shared()],
        ..SplitOptions::default()
    };
    options.output.naming = ChunkNaming::Automatic;

    let manifest = split(modules, entries, options);
    let shared = manifest.chunks_containing("./util.js");
    assert_eq!(shared[0].name, "default~home~map~1");
}

#[test]
fn test_cyclic_issuers_fall_back_to_shared_chunk() {
    let modules = vec![
        Module::script(main_js("home"), 4_000)
            .issued_by_entry("home")
            .depends_on(["./src/lib/a.js"]),
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/lib/b.js"]),
        Module::script("./src/lib/a.js", 15_000)
            .issued_by("./src/lib/b.js")
            .depends_on(["./src/lib/b.js"]),
        Module::script("./src/lib/b.js", 15_000)
            .issued_by("./src/lib/a.js")
            .depends_on(["./src/lib/a.js"]),
    ];
    let entries = vec![Entry::new("home", [main_js("home")]), Entry::new("map", [main_js("map")])];
    let owned = CacheGroup::new("owned", ModuleTest::any())
        .scope(PageScope::EachOwner)
        .priority(10);
    let options = SplitOptions {
        cache_groups: vec![owned, CacheGroup::default_shared()],
        ..SplitOptions::default()
    };

    let graph = ModuleGraph::from_modules(modules).unwrap();
    let splitter = ChunkSplitter::new(entries, options).unwrap();

    let reports = splitter.explain(&graph).unwrap();
    let a = reports.iter().find(|r| r.module == "./src/lib/a.js").unwrap();
    assert_eq!(a.owner, None);
    assert_eq!(a.group.as_deref(), Some("default"));
    assert_eq!(a.referenced_by, vec!["home", "map"]);

    let manifest = splitter.split(&graph).unwrap();
    let holders = manifest.chunks_containing("./src/lib/a.js");
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].kind, ChunkKind::Shared);
    assert_eq!(holders[0].members, vec!["./src/lib/a.js", "./src/lib/b.js"]);
}

#[test]
fn test_hashes_are_stable_and_local() {
    let first = split(shared_helper_graph(), pages(), SplitOptions::default());
    let second = split(shared_helper_graph(), pages(), SplitOptions::default());
    assert_eq!(first, second);

    let mut changed = shared_helper_graph();
    changed[1] = changed[1].clone().with_fingerprint("map-v2");
    let third = split(changed, pages(), SplitOptions::default());

    for (before, after) in first.chunks.iter().zip(&third.chunks) {
        if before.name == "map" {
            assert_ne!(before.content_hash, after.content_hash);
            assert_ne!(before.file_name, after.file_name);
        } else {
            assert_eq!(before.content_hash, after.content_hash);
        }
    }
}

#[test]
fn test_undersized_shared_chunk_is_folded_into_pages() {
    let modules = vec![
        Module::script(main_js("home"), 4_000)
            .issued_by_entry("home")
            .depends_on(["./src/common/format.js"]),
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/common/format.js"]),
        Module::script("./src/common/format.js", 5_000).issued_by(main_js("home")),
    ];
    let entries = vec![Entry::new("home", [main_js("home")]), Entry::new("map", [main_js("map")])];

    let manifest = split(modules, entries, SplitOptions::default());

    assert_eq!(manifest.chunks.len(), 2);
    for chunk in &manifest.chunks {
        assert_eq!(chunk.kind, ChunkKind::Entry);
        assert!(chunk.members.contains(&"./src/common/format.js".to_string()));
        assert!(chunk.dependencies.is_empty());
    }

    assert_eq!(manifest.duplicated.len(), 1);
    assert_eq!(manifest.duplicated[0].module, "./src/common/format.js");
    assert_eq!(manifest.duplicated[0].chunks, vec![0, 1]);
    assert_eq!(manifest.duplicated[0].cause, DuplicationCause::Undersized);
}

#[test]
fn test_no_kept_extraction_below_min_size() {
    let mut modules = shared_helper_graph();
    modules.push(Module::script("./src/common/tiny.js", 300).issued_by(main_js("home")));
    for module in modules.iter_mut().take(2) {
        module.dependencies.push("./src/common/tiny.js".to_string());
    }

    let manifest = split(modules, pages(), SplitOptions::default());
    for chunk in &manifest.chunks {
        if chunk.kind != ChunkKind::Entry {
            assert!(chunk.size >= 20_000, "{} is {} bytes", chunk.name, chunk.size);
        }
    }
    assert_eq!(manifest.chunks_containing("./src/common/tiny.js").len(), 2);
}

/// Every extracted chunk that is not page-scoped meets the size and page
/// count thresholds
fn assert_shared_policy(manifest: &ChunkManifest, min_size: u64, min_chunks: usize) {
    for chunk in manifest.chunks.iter().filter(|c| c.kind == ChunkKind::Shared) {
        assert!(chunk.size >= min_size, "{} is {} bytes", chunk.name, chunk.size);
        assert!(
            chunk.required_by.len() >= min_chunks,
            "{} is only required by {:?}",
            chunk.name,
            chunk.required_by
        );
    }
}

/// `a` shares a large module with `b` and a small one with `c`
fn budget_graph() -> (Vec<Module>, Vec<Entry>) {
    let modules = vec![
        Module::script("./a.js", 1_000)
            .issued_by_entry("a")
            .depends_on(["./x.js", "./y.js"]),
        Module::script("./b.js", 1_000).issued_by_entry("b").depends_on(["./x.js"]),
        Module::script("./c.js", 1_000).issued_by_entry("c").depends_on(["./y.js"]),
        Module::script("./x.js", 30_000).issued_by("./a.js"),
        Module::script("./y.js", 10_000).issued_by("./a.js"),
    ];
    let entries = vec![
        Entry::new("a", ["./a.js"]),
        Entry::new("b", ["./b.js"]),
        Entry::new("c", ["./c.js"]),
    ];
    (modules, entries)
}

fn budget_options(max_initial_requests: usize, max_duplicate_size: Option<u64>) -> SplitOptions {
    SplitOptions {
        defaults: GroupPolicy {
            min_size: 0,
            max_initial_requests,
            ..GroupPolicy::default()
        },
        cache_groups: vec![CacheGroup::default_shared()],
        max_duplicate_size,
        ..SplitOptions::default()
    }
}

#[test]
fn test_request_budget_inlines_least_shared_bytes() {
    let (modules, entries) = budget_graph();
    let manifest = split(modules, entries, budget_options(2, None));

    assert!(manifest.warnings.is_empty());
    assert_eq!(manifest.chunks_for_entry("a").len(), 2);

    let a = manifest.entry_chunk("a").unwrap();
    assert!(a.members.contains(&"./y.js".to_string()));
    assert!(!a.members.contains(&"./x.js".to_string()));

    // the rest of y's chunk only serves c, so it folds into c's own chunk
    let y_holders = manifest.chunks_containing("./y.js");
    assert_eq!(y_holders.len(), 2);
    assert!(y_holders.iter().all(|chunk| chunk.kind == ChunkKind::Entry));
    assert_eq!(manifest.duplicated.len(), 1);
    assert_eq!(manifest.duplicated[0].cause, DuplicationCause::RequestBudget);
    assert_eq!(manifest.chunks_for_entry("c").len(), 1);
    assert_shared_policy(&manifest, 0, 2);
}

#[test]
fn test_budget_trimming_never_leaves_undersized_chunks() {
    let modules = vec![
        Module::script("./a.js", 1_000)
            .issued_by_entry("a")
            .depends_on(["./v1.js", "./v2.js", "./d.js"]),
        Module::script("./b.js", 1_000).issued_by_entry("b").depends_on(["./v1.js"]),
        Module::script("./c.js", 1_000).issued_by_entry("c").depends_on(["./d.js"]),
        Module::script("./e.js", 1_000).issued_by_entry("e").depends_on(["./d.js"]),
        Module::script("./v1.js", 15_000).issued_by("./a.js"),
        Module::script("./v2.js", 10_000).issued_by("./a.js"),
        Module::script("./d.js", 50_000).issued_by("./a.js"),
    ];
    let entries = vec![
        Entry::new("a", ["./a.js"]),
        Entry::new("b", ["./b.js"]),
        Entry::new("c", ["./c.js"]),
        Entry::new("e", ["./e.js"]),
    ];
    let vendors = CacheGroup::new("vendors", |candidate: &Candidate<'_>| -> Result<bool, PredicateError> {
        Ok(candidate.module.id.starts_with("./v"))
    })
    .chunk_name("vendors")
    .priority(10);
    let options = SplitOptions {
        defaults: GroupPolicy {
            max_initial_requests: 2,
            ..GroupPolicy::default()
        },
        cache_groups: vec![vendors, CacheGroup::default_shared()],
        ..SplitOptions::default()
    };

    let manifest = split(modules, entries, options);

    // a inlines vendors; the 15 kB left behind for b is dissolved too
    assert_eq!(manifest.chunks_named("vendors").count(), 0);
    assert_eq!(names(&manifest, "a"), vec!["common-0".to_string(), "a".to_string()]);
    assert_eq!(names(&manifest, "b"), vec!["b".to_string()]);
    assert!(manifest.entry_chunk("b").unwrap().members.contains(&"./v1.js".to_string()));
    assert!(manifest.warnings.is_empty());
    assert_shared_policy(&manifest, 20_000, 2);
}

#[test]
fn test_duplication_limit_keeps_chunk_and_warns() {
    let (modules, entries) = budget_graph();
    let manifest = split(modules, entries, budget_options(2, Some(5_000)));

    assert!(manifest.duplicated.is_empty());
    assert_eq!(manifest.chunks_for_entry("a").len(), 3);
    assert_eq!(
        manifest.warnings,
        vec![SplitWarning::BudgetExceeded {
            entry: "a".to_string(),
            requests: 3,
            budget: 2,
            cause: BudgetCause::DuplicationLimit,
        }]
    );
}

#[test]
fn test_async_entries_use_async_budget() {
    let (modules, mut entries) = budget_graph();
    entries[0] = entries[0].clone().with_loading(Loading::Async);
    let mut options = budget_options(30, None);
    options.defaults.max_async_requests = 2;

    let manifest = split(modules, entries, options);
    assert_eq!(manifest.chunks_for_entry("a").len(), 2);
    assert!(manifest.warnings.is_empty());
}

#[test]
fn test_enforced_chunks_can_exceed_budget() {
    let modules = vec![
        Module::script(main_js("map"), 4_000)
            .issued_by_entry("map")
            .depends_on(["./src/pages/map/map.css"]),
        Module::style("./src/pages/map/map.css", 1_200).issued_by(main_js("map")),
    ];
    let options = SplitOptions {
        defaults: GroupPolicy {
            max_initial_requests: 1,
            ..GroupPolicy::default()
        },
        cache_groups: vec![CacheGroup::page_styles("mapStyles", "map")],
        ..SplitOptions::default()
    };

    let manifest = split(modules, vec![Entry::new("map", [main_js("map")])], options);

    assert_eq!(manifest.chunks.len(), 2);
    assert_eq!(
        manifest.warnings,
        vec![SplitWarning::BudgetExceeded {
            entry: "map".to_string(),
            requests: 2,
            budget: 1,
            cause: BudgetCause::Enforced,
        }]
    );
}

#[test]
fn test_automatic_names_list_sharing_pages() {
    let modules = vec![
        Module::script("./home.js", 1_000)
            .issued_by_entry("home")
            .depends_on(["./node_modules/react/index.js"]),
        Module::script("./map.js", 1_000)
            .issued_by_entry("map")
            .depends_on(["./node_modules/react/index.js"]),
        Module::script("./node_modules/react/index.js", 40_000).issued_by("./home.js"),
    ];
    let entries = vec![Entry::new("home", ["./home.js"]), Entry::new("map", ["./map.js"])];
    let mut options = SplitOptions::default();
    options.output.naming = ChunkNaming::Automatic;

    let manifest = split(modules, entries, options);
    let vendors = manifest.chunks_containing("./node_modules/react/index.js");
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].name, "defaultVendors~home~map");
    assert_eq!(vendors[0].group.as_deref(), Some("defaultVendors"));
}

#[test]
fn test_every_reachable_module_is_loadable_by_its_pages() {
    let (modules, entries) = budget_graph();
    let manifest = split(modules, entries, budget_options(2, None));

    let expected = [
        ("a", vec!["./a.js", "./x.js", "./y.js"]),
        ("b", vec!["./b.js", "./x.js"]),
        ("c", vec!["./c.js", "./y.js"]),
    ];
    for (entry, needed) in expected {
        let loaded: Vec<&String> = manifest
            .chunks_for_entry(entry)
            .iter()
            .flat_map(|chunk| chunk.members.iter())
            .collect();
        for module in needed {
            assert!(loaded.iter().any(|m| *m == module), "{} cannot load {}", entry, module);
        }
    }
}

#[test]
fn test_fatal_configuration_errors() {
    let graph = ModuleGraph::from_modules(shared_helper_graph()).unwrap();

    let err = ChunkSplitter::new(vec![Entry::new("home", Vec::<String>::new())], SplitOptions::default())
        .unwrap_err();
    assert_eq!(err, SplitError::EmptyEntry { entry: "home".to_string() });

    let splitter =
        ChunkSplitter::new(vec![Entry::new("admin", ["./src/pages/admin/main.js"])], SplitOptions::default())
            .unwrap();
    assert_eq!(
        splitter.split(&graph).unwrap_err(),
        SplitError::UnknownRoot {
            entry: "admin".to_string(),
            module: "./src/pages/admin/main.js".to_string(),
        }
    );

    assert_eq!(
        ChunkSplitter::new(vec![], SplitOptions::default()).unwrap_err(),
        SplitError::NoEntries
    );
}

#[test]
fn test_graph_json_detects_module_kinds() {
    let graph = ModuleGraph::from_json(
        r#"{"modules": [
            {"id": "./main.js", "size": 10, "dependencies": ["./main.css"], "issuers": [{"entry": "home"}]},
            {"id": "./main.css", "size": 5, "issuers": [{"module": "./main.js"}]}
        ]}"#,
    )
    .unwrap();

    let css = graph.index_of("./main.css").unwrap();
    assert_eq!(graph.kind_of(css), ModuleKind::Style);
    assert_eq!(graph.fingerprint_of(css), "./main.css");

    let manifest = ChunkSplitter::new(vec![Entry::new("home", ["./main.js"])], SplitOptions::default())
        .unwrap()
        .split(&graph)
        .unwrap();
    assert_eq!(manifest.chunks.len(), 1);
    assert_eq!(manifest.chunks[0].members, vec!["./main.css", "./main.js"]);
}
