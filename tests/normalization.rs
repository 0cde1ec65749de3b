//! End-to-end normalization and injection behavior.

use bindery::{
    BinderyError, Component, ComponentRef, CompressionMode, Inject, Injector, LazyComponent,
    NormalizedComponentStorage, Result, TypeId, Upcast,
};
use std::sync::Arc;

struct Config {
    name: &'static str,
}

struct Dep;

impl Inject for Dep {
    fn inject(_injector: &mut Injector) -> Result<Self> {
        Ok(Dep)
    }
}

trait Api: Send + Sync {
    fn tag(&self) -> &'static str;
}

struct ApiImpl {
    _dep: Arc<Dep>,
}

impl Inject for ApiImpl {
    fn inject(injector: &mut Injector) -> Result<Self> {
        Ok(Self {
            _dep: injector.get::<Dep>()?,
        })
    }

    fn dependencies() -> Vec<TypeId> {
        vec![TypeId::of::<Dep>()]
    }
}

impl Api for ApiImpl {
    fn tag(&self) -> &'static str {
        "impl"
    }
}

impl Upcast<dyn Api> for ApiImpl {
    fn upcast(self: Arc<Self>) -> Arc<dyn Api> {
        self
    }
}

struct OtherApiImpl;

impl Inject for OtherApiImpl {
    fn inject(_injector: &mut Injector) -> Result<Self> {
        Ok(OtherApiImpl)
    }
}

impl Api for OtherApiImpl {
    fn tag(&self) -> &'static str {
        "other"
    }
}

impl Upcast<dyn Api> for OtherApiImpl {
    fn upcast(self: Arc<Self>) -> Arc<dyn Api> {
        self
    }
}

/// Depends on the concrete implementation type, not the interface.
struct NeedsImpl {
    _inner: Arc<ApiImpl>,
}

impl Inject for NeedsImpl {
    fn inject(injector: &mut Injector) -> Result<Self> {
        Ok(Self {
            _inner: injector.get::<ApiImpl>()?,
        })
    }

    fn dependencies() -> Vec<TypeId> {
        vec![TypeId::of::<ApiImpl>()]
    }
}

fn api_component() -> Component {
    Component::new()
        .bind::<dyn Api, ApiImpl>()
        .register_provider::<ApiImpl>()
        .register_provider::<Dep>()
}

fn dep_component() -> Component {
    Component::new().register_provider::<Dep>()
}

fn assert_same_tables(a: &NormalizedComponentStorage, b: &NormalizedComponentStorage) {
    assert_eq!(a.binding_type_ids(), b.binding_type_ids());
    for type_id in a.binding_type_ids() {
        let left = a.binding(type_id).unwrap();
        let right = b.binding(type_id).unwrap();
        assert!(left.equivalent(right), "bindings for {type_id} diverge");
    }
}

// --- conflicts -------------------------------------------------------------

#[test]
fn two_instance_bindings_for_one_type_collide() {
    let component = Component::new()
        .bind_instance(Arc::new(Config { name: "a" }))
        .bind_instance(Arc::new(Config { name: "b" }));
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(err, BinderyError::multiple_bindings(TypeId::of::<Config>()));
}

#[test]
fn two_implementations_for_one_interface_collide() {
    let component = Component::new()
        .bind::<dyn Api, ApiImpl>()
        .bind::<dyn Api, OtherApiImpl>();
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(err, BinderyError::multiple_bindings(TypeId::of::<dyn Api>()));
}

#[test]
fn binding_the_same_object_twice_is_idempotent() {
    let object = Arc::new(Config { name: "a" });
    let component = Component::new()
        .bind_instance(object.clone())
        .bind_instance(object);
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    assert_eq!(storage.binding_count(), 1);
}

// --- lazy component expansion ---------------------------------------------

#[test]
fn installing_the_same_component_twice_expands_once() {
    let component = Component::new()
        .install(dep_component)
        .install(dep_component);
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    assert_eq!(storage.binding_count(), 1);
}

#[test]
fn empty_component_normalizes_to_empty_storage() {
    let storage =
        NormalizedComponentStorage::new(Component::new(), &[], CompressionMode::Permanent)
            .unwrap();
    assert!(storage.is_empty());
}

fn cyclic_g1() -> Component {
    Component::new().install(cyclic_g2)
}

fn cyclic_g2() -> Component {
    Component::new().install(cyclic_g1)
}

#[test]
fn installation_cycle_is_reported_with_its_path() {
    let component = Component::new().install(cyclic_g1);
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(
        err,
        BinderyError::installation_loop(vec![
            ComponentRef::of(cyclic_g1),
            ComponentRef::of(cyclic_g2),
            ComponentRef::of(cyclic_g1),
        ])
    );
}

struct TagValue(&'static str);

fn tagged_component(tag: &'static str) -> Component {
    Component::new().add_multibinding_instance(Arc::new(TagValue(tag)))
}

#[test]
fn with_args_components_deduplicate_structurally() {
    let component = Component::new()
        .install_with_args(tagged_component, "a")
        .install_with_args(tagged_component, "a")
        .install_with_args(tagged_component, "b");
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    // one expansion per distinct (fn, args) identity
    assert_eq!(
        storage.multibinding_set(TypeId::of::<TagValue>()).unwrap().len(),
        2
    );
}

// --- replacements ----------------------------------------------------------

fn real_component() -> Component {
    Component::new().bind_instance(Arc::new(Config { name: "real" }))
}

fn fake_component() -> Component {
    Component::new().bind_instance(Arc::new(Config { name: "fake" }))
}

fn third_component() -> Component {
    Component::new().bind_instance(Arc::new(Config { name: "third" }))
}

#[test]
fn replacement_substitutes_the_target() {
    let component = Component::new()
        .replace(real_component, fake_component)
        .install(real_component);
    let mut injector = Injector::new(component, &[]).unwrap();
    let config = injector.get::<Config>().unwrap();
    assert_eq!(config.name, "fake");
}

#[test]
fn replacement_without_installation_is_dropped() {
    let component = Component::new().replace(real_component, fake_component);
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    assert!(storage.is_empty());
}

struct StageA;
struct StageB;
struct StageC;

impl Inject for StageA {
    fn inject(_injector: &mut Injector) -> Result<Self> {
        Ok(StageA)
    }
}

impl Inject for StageB {
    fn inject(_injector: &mut Injector) -> Result<Self> {
        Ok(StageB)
    }
}

impl Inject for StageC {
    fn inject(_injector: &mut Injector) -> Result<Self> {
        Ok(StageC)
    }
}

fn stage_a() -> Component {
    Component::new().register_provider::<StageA>()
}

fn stage_b() -> Component {
    Component::new().register_provider::<StageB>()
}

fn stage_c() -> Component {
    Component::new().register_provider::<StageC>()
}

#[test]
fn replacement_chain_resolves_to_its_end() {
    let chained = Component::new()
        .replace(stage_a, stage_b)
        .replace(stage_b, stage_c)
        .install(stage_a);
    let direct = Component::new().install(stage_c);
    let chained =
        NormalizedComponentStorage::new(chained, &[], CompressionMode::Permanent).unwrap();
    let direct = NormalizedComponentStorage::new(direct, &[], CompressionMode::Permanent).unwrap();
    assert_same_tables(&chained, &direct);
}

#[test]
fn replacement_cycle_is_reported() {
    let component = Component::new()
        .replace(real_component, fake_component)
        .replace(fake_component, real_component)
        .install(real_component);
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(
        err,
        BinderyError::installation_loop(vec![
            ComponentRef::of(real_component),
            ComponentRef::of(fake_component),
            ComponentRef::of(real_component),
        ])
    );
}

#[test]
fn conflicting_replacements_are_rejected() {
    let component = Component::new()
        .replace(real_component, fake_component)
        .replace(real_component, third_component)
        .install(real_component);
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(
        err,
        BinderyError::incompatible_replacements(
            ComponentRef::of(real_component),
            ComponentRef::of(fake_component),
            ComponentRef::of(third_component),
        )
    );
}

#[test]
fn repeating_the_same_replacement_is_idempotent() {
    let component = Component::new()
        .replace(real_component, fake_component)
        .replace(real_component, fake_component)
        .install(real_component);
    let mut injector = Injector::new(component, &[]).unwrap();
    assert_eq!(injector.get::<Config>().unwrap().name, "fake");
}

#[test]
fn replacement_after_expansion_is_rejected() {
    let component = Component::new()
        .install(real_component)
        .replace(real_component, fake_component);
    let err =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap_err();
    assert_eq!(
        err,
        BinderyError::replacement_after_expansion(
            ComponentRef::of(real_component),
            ComponentRef::of(fake_component),
        )
    );
}

fn counted_component(n: u32) -> Component {
    let _ = n;
    Component::new().register_provider::<Dep>()
}

#[test]
fn with_args_replacement_matches_structurally() {
    let component = Component::new()
        .replace_component(
            LazyComponent::with_args(counted_component, 1u32),
            LazyComponent::of(real_component),
        )
        .install_with_args(counted_component, 1u32);
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    // the (fn, 1) installation landed on the replacement
    assert!(storage.binding(TypeId::of::<Dep>()).is_none());
    assert!(storage.binding(TypeId::of::<Config>()).is_some());
}

// --- binding compression ---------------------------------------------------

#[test]
fn compression_fuses_interface_and_implementation() {
    let exposed = [TypeId::of::<dyn Api>()];
    let storage =
        NormalizedComponentStorage::new(api_component(), &exposed, CompressionMode::Permanent)
            .unwrap();
    assert!(storage.binding(TypeId::of::<ApiImpl>()).is_none());
    let fused = storage.binding(TypeId::of::<dyn Api>()).unwrap();
    assert_eq!(fused.deps(), &[TypeId::of::<Dep>()]);

    let mut injector = Injector::new(api_component(), &exposed).unwrap();
    assert_eq!(injector.get::<dyn Api>().unwrap().tag(), "impl");
}

#[test]
fn compression_withheld_when_implementation_is_exposed() {
    let exposed = [TypeId::of::<dyn Api>(), TypeId::of::<ApiImpl>()];
    let storage =
        NormalizedComponentStorage::new(api_component(), &exposed, CompressionMode::Permanent)
            .unwrap();
    let forwarding = storage.binding(TypeId::of::<dyn Api>()).unwrap();
    assert_eq!(forwarding.deps(), &[TypeId::of::<ApiImpl>()]);
    let concrete = storage.binding(TypeId::of::<ApiImpl>()).unwrap();
    assert_eq!(concrete.deps(), &[TypeId::of::<Dep>()]);
}

#[test]
fn compression_withheld_when_another_binding_depends_on_implementation() {
    let component = api_component().register_provider::<NeedsImpl>();
    let storage = NormalizedComponentStorage::new(
        component,
        &[TypeId::of::<dyn Api>()],
        CompressionMode::Permanent,
    )
    .unwrap();
    assert!(storage.binding(TypeId::of::<ApiImpl>()).is_some());
}

#[test]
fn compression_withheld_for_multibinding_types() {
    let component = api_component().add_multibinding_provider::<ApiImpl>();
    let storage = NormalizedComponentStorage::new(
        component,
        &[TypeId::of::<dyn Api>()],
        CompressionMode::Permanent,
    )
    .unwrap();
    assert!(storage.binding(TypeId::of::<ApiImpl>()).is_some());
}

#[test]
fn overlay_referencing_compressed_type_undoes_the_fold() {
    let exposed = [TypeId::of::<dyn Api>()];
    let base = Arc::new(
        NormalizedComponentStorage::new(api_component(), &exposed, CompressionMode::Undoable)
            .unwrap(),
    );
    assert!(base.binding(TypeId::of::<ApiImpl>()).is_none());
    assert!(base.has_compression_undo_for(TypeId::of::<ApiImpl>()));

    let overlay = Component::new().register_provider::<NeedsImpl>();
    let mut injector =
        Injector::with_base(base, overlay, &[TypeId::of::<NeedsImpl>()]).unwrap();
    {
        let own = injector.storage();
        let concrete = own.binding(TypeId::of::<ApiImpl>()).unwrap();
        assert_eq!(concrete.deps(), &[TypeId::of::<Dep>()]);
        let forwarding = own.binding(TypeId::of::<dyn Api>()).unwrap();
        assert_eq!(forwarding.deps(), &[TypeId::of::<ApiImpl>()]);
    }
    assert!(injector.get::<NeedsImpl>().is_ok());
    assert_eq!(injector.get::<dyn Api>().unwrap().tag(), "impl");
}

#[test]
fn overlay_exposing_compressed_type_undoes_the_fold() {
    let base = Arc::new(
        NormalizedComponentStorage::new(
            api_component(),
            &[TypeId::of::<dyn Api>()],
            CompressionMode::Undoable,
        )
        .unwrap(),
    );
    let mut injector =
        Injector::with_base(base, Component::new(), &[TypeId::of::<ApiImpl>()]).unwrap();
    assert!(injector.get::<ApiImpl>().is_ok());
}

#[test]
fn permanent_mode_records_no_undo_information() {
    let storage = NormalizedComponentStorage::new(
        api_component(),
        &[TypeId::of::<dyn Api>()],
        CompressionMode::Permanent,
    )
    .unwrap();
    assert!(!storage.has_compression_undo_for(TypeId::of::<ApiImpl>()));
}

// --- multibindings ---------------------------------------------------------

trait Listener: Send + Sync {}

struct ListenerImpl;

impl Listener for ListenerImpl {}

#[test]
fn adding_the_same_multibinding_three_times_keeps_all_three() {
    let listener: Arc<dyn Listener> = Arc::new(ListenerImpl);
    let component = Component::new()
        .add_multibinding_instance(listener.clone())
        .add_multibinding_instance(listener.clone())
        .add_multibinding_instance(listener.clone());
    let storage =
        NormalizedComponentStorage::new(component, &[], CompressionMode::Permanent).unwrap();
    assert_eq!(
        storage
            .multibinding_set(TypeId::of::<dyn Listener>())
            .unwrap()
            .len(),
        3
    );

    let component = Component::new()
        .add_multibinding_instance(listener.clone())
        .add_multibinding_instance(listener.clone())
        .add_multibinding_instance(listener.clone());
    let mut injector = Injector::new(component, &[]).unwrap();
    let list = injector.get_multibindings::<dyn Listener>().unwrap();
    assert_eq!(list.len(), 3);
    assert!(Arc::ptr_eq(&list[0], &listener));
}

#[test]
fn multibindings_inside_a_component_count_once_per_expansion() {
    fn listener_component() -> Component {
        Component::new().add_multibinding_provider::<Dep>()
    }
    let component = Component::new()
        .install(listener_component)
        .install(listener_component);
    let mut injector = Injector::new(component, &[]).unwrap();
    let list = injector.get_multibindings::<Dep>().unwrap();
    assert_eq!(list.len(), 1);
}

#[test]
fn multibinding_list_is_materialized_once() {
    let component = Component::new().add_multibinding_provider::<Dep>();
    let mut injector = Injector::new(component, &[]).unwrap();
    let first = injector.get_multibindings::<Dep>().unwrap();
    let second = injector.get_multibindings::<Dep>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

// --- stream order invariance ----------------------------------------------

#[test]
fn entry_order_does_not_change_the_table() {
    let config = Arc::new(Config { name: "a" });
    let forward = Component::new()
        .bind_instance(config.clone())
        .register_provider::<Dep>()
        .install(dep_component);
    let backward = Component::new()
        .install(dep_component)
        .register_provider::<Dep>()
        .bind_instance(config);
    let forward =
        NormalizedComponentStorage::new(forward, &[], CompressionMode::Permanent).unwrap();
    let backward =
        NormalizedComponentStorage::new(backward, &[], CompressionMode::Permanent).unwrap();
    assert_same_tables(&forward, &backward);
}

// --- exposed roots and lookup ---------------------------------------------

#[test]
fn exposed_type_without_a_binding_is_rejected() {
    struct Unbound;
    let exposed = [TypeId::of::<Unbound>()];
    let err = NormalizedComponentStorage::new(
        Component::new(),
        &exposed,
        CompressionMode::Permanent,
    )
    .unwrap_err();
    assert_eq!(err, BinderyError::type_not_bound(TypeId::of::<Unbound>()));
}

struct LoopA;
struct LoopB;

impl Inject for LoopA {
    fn inject(injector: &mut Injector) -> Result<Self> {
        let _ = injector.get::<LoopB>()?;
        Ok(LoopA)
    }

    fn dependencies() -> Vec<TypeId> {
        vec![TypeId::of::<LoopB>()]
    }
}

impl Inject for LoopB {
    fn inject(injector: &mut Injector) -> Result<Self> {
        let _ = injector.get::<LoopA>()?;
        Ok(LoopB)
    }

    fn dependencies() -> Vec<TypeId> {
        vec![TypeId::of::<LoopA>()]
    }
}

#[test]
fn dependency_loop_is_detected_at_lookup() {
    let component = Component::new()
        .register_provider::<LoopA>()
        .register_provider::<LoopB>();
    let mut injector = Injector::new(component, &[]).unwrap();
    let err = injector.get::<LoopA>().err().unwrap();
    assert_eq!(
        err,
        BinderyError::self_loop(vec![
            TypeId::of::<LoopA>(),
            TypeId::of::<LoopB>(),
            TypeId::of::<LoopA>(),
        ])
    );
}
