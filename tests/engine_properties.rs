use chrono::NaiveDate;
use levy_core::compute::{kernel, Origin, Request, RequestMode};
use levy_core::entity::Projection;
use levy_core::store::VariantBody;
use levy_core::{
    Aggregation, ComputationError, EngineConfig, EntityKind, Legislation, ParameterError, Period, PeriodError,
    PeriodUnit, Population, Registry, RegistryError, Role, Simulation, Value, Variable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn year(y: i32) -> Period {
    Period::year(y).unwrap()
}

fn single_person() -> Population {
    Population::builder(1).group("household", [(0, Role::Primary)]).build().unwrap()
}

/// Household 0: primary, partner, one dependent. Household 1: a lone primary.
fn two_households() -> Population {
    Population::builder(4)
        .group("household", [(0, Role::Primary), (1, Role::Partner), (2, Role::Dependent(1))])
        .group("household", [(3, Role::Primary)])
        .build()
        .unwrap()
}

fn household() -> EntityKind {
    EntityKind::group("household")
}

#[test]
fn test_formula_runs_at_most_once_per_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut reg = Registry::new();
    reg.register(Variable::float("counted", EntityKind::Person, PeriodUnit::Year).variant(
        date(2000, 1, 1),
        None,
        move |ctx, p| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((p, ctx.filled(&EntityKind::Person, 42.0)?))
        },
    ))
    .unwrap();

    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    for _ in 0..10 {
        assert_eq!(sim.calculate("counted", year(2013)).unwrap(), Value::from(vec![42.0]));
    }
    // Every month of the year normalizes to the same yearly key.
    for month in year(2013).decompose(PeriodUnit::Month).unwrap() {
        sim.calculate("counted", month).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    sim.calculate("counted", year(2014)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cyclic_dependency_is_rejected() {
    let mut reg = Registry::new();
    reg.register(
        Variable::float("a", EntityKind::Person, PeriodUnit::Year)
            .variant(date(2000, 1, 1), None, |ctx, p| Ok((p, ctx.calculate("b", p)?))),
    )
    .unwrap();
    reg.register(
        Variable::float("b", EntityKind::Person, PeriodUnit::Year)
            .variant(date(2000, 1, 1), None, |ctx, p| Ok((p, ctx.calculate("a", p)?))),
    )
    .unwrap();

    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    match sim.calculate("a", year(2013)) {
        Err(ComputationError::CyclicDependency { cycle }) => {
            let names: Vec<&str> = cycle.iter().map(|f| f.variable.as_str()).collect();
            assert_eq!(names, vec!["a", "b", "a"]);
            assert!(cycle.iter().all(|f| f.period == year(2013)));
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
    // The stack unwinds and nothing half-computed is cached.
    assert_eq!(sim.depth(), 0);
    assert!(sim.ledger().is_empty());
}

#[test]
fn test_self_reference_over_previous_period_is_not_a_cycle() {
    let mut reg = Registry::new();
    reg.register(Variable::float("stock", EntityKind::Person, PeriodUnit::Year).variant(
        date(2000, 1, 1),
        None,
        |ctx, p| {
            if p.start() <= date(2010, 1, 1) {
                return Ok((p, ctx.filled(&EntityKind::Person, 100.0)?));
            }
            let before = ctx.floats("stock", p.offset(-1)?)?;
            Ok((p, Value::from(kernel::scale(&before, 1.1))))
        },
    ))
    .unwrap();

    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    let Value::Float(v) = sim.calculate("stock", year(2012)).unwrap() else { panic!("float expected") };
    assert!((v[0] - 121.0).abs() < 1e-9);
}

#[test]
fn test_unbounded_recursion_hits_depth_limit() {
    let mut reg = Registry::new();
    reg.register(
        Variable::float("endless", EntityKind::Person, PeriodUnit::Year)
            .variant(date(1, 1, 1), None, |ctx, p| Ok((p, ctx.calculate("endless", p.offset(-1)?)?))),
    )
    .unwrap();

    let leg = Legislation::new();
    let pop = single_person();
    let config = EngineConfig { max_depth: 16, ..EngineConfig::default() };
    let mut sim = Simulation::new(&reg, &leg, &pop, config);
    assert!(matches!(
        sim.calculate("endless", year(2013)),
        Err(ComputationError::RecursionLimit { depth: 16, .. })
    ));
    assert_eq!(sim.depth(), 0);
}

#[test]
fn test_default_depth_limit_fits_a_worker_stack() {
    let outcome = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(|| {
            let mut reg = Registry::new();
            reg.register(
                Variable::float("endless", EntityKind::Person, PeriodUnit::Year)
                    .variant(date(1, 1, 1), None, |ctx, p| Ok((p, ctx.calculate("endless", p.offset(-1)?)?))),
            )
            .unwrap();
            let leg = Legislation::new();
            let pop = single_person();
            let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
            matches!(
                sim.calculate("endless", year(2013)),
                Err(ComputationError::RecursionLimit { depth, .. }) if depth == EngineConfig::default().max_depth
            )
        })
        .unwrap()
        .join()
        .unwrap();
    assert!(outcome);
}

fn versioned(outside_default: bool) -> Registry {
    let mut var = Variable::float("allowance", EntityKind::Person, PeriodUnit::Year)
        .default(-1.0)
        .variant(date(2002, 1, 1), Some(date(2002, 12, 31)), |ctx, p| Ok((p, ctx.filled(&EntityKind::Person, 1.0)?)))
        .variant(date(2003, 1, 1), Some(date(2004, 12, 31)), |ctx, p| Ok((p, ctx.filled(&EntityKind::Person, 2.0)?)));
    if outside_default {
        var = var.default_outside_variants();
    }
    let mut reg = Registry::new();
    reg.register(var).unwrap();
    reg
}

#[test]
fn test_variant_boundaries() {
    let reg = versioned(false);
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());

    assert_eq!(sim.calculate("allowance", year(2002)).unwrap(), Value::from(vec![1.0]));
    assert_eq!(sim.calculate("allowance", year(2003)).unwrap(), Value::from(vec![2.0]));
    assert_eq!(sim.calculate("allowance", year(2004)).unwrap(), Value::from(vec![2.0]));
    assert!(matches!(
        sim.calculate("allowance", year(2005)),
        Err(ComputationError::NoApplicableVariant { ref variable, .. }) if variable == "allowance"
    ));
    assert!(matches!(
        sim.calculate("allowance", year(2001)),
        Err(ComputationError::NoApplicableVariant { .. })
    ));
}

#[test]
fn test_default_outside_variants() {
    let reg = versioned(true);
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    assert_eq!(sim.calculate("allowance", year(2005)).unwrap(), Value::from(vec![-1.0]));
    let key = sim.cache_key("allowance", year(2005)).unwrap();
    assert_eq!(sim.ledger().origin(&key), Some(Origin::Default));
}

#[test]
fn test_variable_window_short_circuits_variants() {
    let mut reg = Registry::new();
    reg.register(
        Variable::float("bonus", EntityKind::Person, PeriodUnit::Year)
            .active_between(date(2010, 1, 1), Some(date(2012, 12, 31)))
            .variant(date(2000, 1, 1), None, |ctx, p| Ok((p, ctx.filled(&EntityKind::Person, 5.0)?))),
    )
    .unwrap();
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    assert_eq!(sim.calculate("bonus", year(2009)).unwrap(), Value::from(vec![0.0]));
    assert_eq!(sim.calculate("bonus", year(2011)).unwrap(), Value::from(vec![5.0]));
    assert_eq!(sim.calculate("bonus", year(2013)).unwrap(), Value::from(vec![0.0]));
}

fn monthly_wage() -> Registry {
    let mut reg = Registry::new();
    reg.register(
        Variable::float("wage", EntityKind::Person, PeriodUnit::Month)
            .variant(date(2000, 1, 1), None, |ctx, p| Ok((p, ctx.filled(&EntityKind::Person, 1500.0)?))),
    )
    .unwrap();
    reg.register(Variable::float("annual_bonus", EntityKind::Person, PeriodUnit::Year).input()).unwrap();
    reg
}

#[test]
fn test_calculate_add_sums_months() {
    let reg = monthly_wage();
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());

    let total = sim.calculate_add("wage", year(2013)).unwrap();
    assert_eq!(total, Value::from(vec![12.0 * 1500.0]));

    let mut by_hand = 0.0;
    for month in year(2013).decompose(PeriodUnit::Month).unwrap() {
        if let Value::Float(v) = sim.calculate("wage", month).unwrap() {
            by_hand += v[0];
        }
    }
    assert_eq!(total, Value::from(vec![by_hand]));
}

#[test]
fn test_monthly_variable_over_a_year_needs_add() {
    let reg = monthly_wage();
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    assert!(matches!(
        sim.calculate("wage", year(2013)),
        Err(ComputationError::PeriodMismatch { unit: PeriodUnit::Month, .. })
    ));
    // A yearly variable cannot be cut into months by adding.
    assert!(matches!(
        sim.calculate_add("annual_bonus", Period::month(2013, 3).unwrap()),
        Err(ComputationError::Period(PeriodError::InvalidDecomposition { .. }))
    ));
}

#[test]
fn test_divide_and_add_divide() {
    let reg = monthly_wage();
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    sim.set_input("annual_bonus", year(2013), vec![1200.0]).unwrap();

    assert_eq!(sim.calculate_divide("annual_bonus", Period::month(2013, 5).unwrap()).unwrap(), Value::from(vec![100.0]));

    let quarter = Period::new(PeriodUnit::Month, date(2013, 1, 1), 3).unwrap();
    assert_eq!(sim.calculate_add_divide("annual_bonus", quarter).unwrap(), Value::from(vec![300.0]));
    assert_eq!(sim.calculate_add_divide("wage", quarter).unwrap(), Value::from(vec![4500.0]));
    assert!(matches!(
        sim.calculate_divide("annual_bonus", quarter),
        Err(ComputationError::Period(PeriodError::InvalidDecomposition { .. }))
    ));
}

#[test]
fn test_parameter_effective_dating() {
    let leg = Legislation::builder()
        .set("benefit.amount", date(2010, 1, 1), 100.0)
        .set("benefit.amount", date(2012, 6, 1), 150.0)
        .build()
        .unwrap();
    assert_eq!(leg.resolve("benefit.amount", date(2011, 1, 1)).unwrap(), 100.0);
    assert_eq!(leg.resolve("benefit.amount", date(2012, 6, 1)).unwrap(), 150.0);
    assert!(matches!(
        leg.resolve("benefit.amount", date(2009, 1, 1)),
        Err(ParameterError::NotEffectiveYet { .. })
    ));
    assert!(matches!(leg.resolve("benefit.missing", date(2011, 1, 1)), Err(ParameterError::NotFound { .. })));
}

#[test]
fn test_parameter_errors_propagate_through_formulas() {
    let mut reg = Registry::new();
    reg.register(Variable::float("benefit", EntityKind::Person, PeriodUnit::Year).variant(
        date(2000, 1, 1),
        None,
        |ctx, p| {
            let amount = ctx.parameter("benefit.amount", p.start())?;
            Ok((p, ctx.filled(&EntityKind::Person, amount)?))
        },
    ))
    .unwrap();
    let leg = Legislation::builder().set("benefit.amount", date(2010, 1, 1), 100.0).build().unwrap();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());

    assert!(matches!(
        sim.calculate("benefit", year(2009)),
        Err(ComputationError::Parameter(ParameterError::NotEffectiveYet { .. }))
    ));
    // The failure was not cached; a valid year still computes.
    assert_eq!(sim.calculate("benefit", year(2011)).unwrap(), Value::from(vec![100.0]));
    assert!(sim.calculate("benefit", year(2009)).is_err());
}

#[test]
fn test_entity_projection_aggregation() {
    let pop = two_households();
    let proj: Projection<'_> = pop.projection(&"household".into()).unwrap();
    let income = [10.0, 20.0, 5.0, 7.0];
    assert_eq!(proj.sum_by_entity(&income, None).unwrap(), vec![35.0, 7.0]);
    assert_eq!(proj.filter_role(&income, Role::Dependent(1), 0.0).unwrap(), vec![5.0, 0.0]);
    assert_eq!(proj.filter_role(&income, Role::Partner, 0.0).unwrap(), vec![20.0, 0.0]);
}

#[test]
fn test_projection_checks_entity_kinds() {
    // Two persons in two single-member households, declared in reverse order.
    let pop = Population::builder(2)
        .group("household", [(1, Role::Primary)])
        .group("household", [(0, Role::Primary)])
        .build()
        .unwrap();
    let start = date(2000, 1, 1);
    let mut reg = Registry::new();
    reg.register(Variable::float("rent", household(), PeriodUnit::Year).input()).unwrap();
    reg.register(Variable::float("salary", EntityKind::Person, PeriodUnit::Year).input()).unwrap();

    let misdeclared = Variable::float("rent_copy", household(), PeriodUnit::Year)
        .entity_to_person(start, "rent", "household", None);
    assert!(matches!(reg.register(misdeclared), Err(RegistryError::ProjectionEntityMismatch { .. })));

    // Sources are only known at evaluation time.
    reg.register(
        Variable::float("salary_share", EntityKind::Person, PeriodUnit::Year)
            .entity_to_person(start, "salary", "household", None),
    )
    .unwrap();
    reg.register(
        Variable::float("rent_total", household(), PeriodUnit::Year)
            .person_to_entity(start, "rent", "household", Aggregation::Sum, None),
    )
    .unwrap();
    reg.register(
        Variable::float("rent_each", EntityKind::Person, PeriodUnit::Year)
            .entity_to_person(start, "rent", "household", None),
    )
    .unwrap();

    let leg = Legislation::new();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    sim.set_input("rent", year(2013), vec![100.0, 200.0]).unwrap();
    sim.set_input("salary", year(2013), vec![10.0, 20.0]).unwrap();

    assert!(matches!(
        sim.calculate("salary_share", year(2013)),
        Err(ComputationError::Registry(RegistryError::ProjectionEntityMismatch { name, actual: EntityKind::Person, .. }))
            if name == "salary"
    ));
    assert!(matches!(
        sim.calculate("rent_total", year(2013)),
        Err(ComputationError::Registry(RegistryError::ProjectionEntityMismatch { expected: EntityKind::Person, .. }))
    ));
    assert_eq!(sim.calculate("rent_each", year(2013)).unwrap(), Value::from(vec![200.0, 100.0]));
}

fn household_registry() -> Registry {
    let start = date(2000, 1, 1);
    let mut reg = Registry::new();
    reg.register(Variable::float("income", EntityKind::Person, PeriodUnit::Year).input()).unwrap();
    reg.register(Variable::boolean("disabled", EntityKind::Person, PeriodUnit::Year).input()).unwrap();
    reg.register(Variable::float("rent", household(), PeriodUnit::Year).input()).unwrap();
    reg.register(
        Variable::float("household_income", household(), PeriodUnit::Year)
            .person_to_entity(start, "income", "household", Aggregation::Sum, None),
    )
    .unwrap();
    reg.register(
        Variable::boolean("any_disabled", household(), PeriodUnit::Year)
            .person_to_entity(start, "disabled", "household", Aggregation::Any, None),
    )
    .unwrap();
    reg.register(
        Variable::float("rent_paid", EntityKind::Person, PeriodUnit::Year)
            .entity_to_person(start, "rent", "household", Some(Role::Primary)),
    )
    .unwrap();
    reg.register(Variable::float("housing_aid", household(), PeriodUnit::Year).variant(start, None, |ctx, p| {
        let ceiling = ctx.parameter("housing.ceiling", p.start())?;
        let rate = ctx.parameter("housing.rate", p.start())?;
        let income = ctx.floats("household_income", p)?;
        let rent = ctx.floats("rent", p)?;
        let disabled = ctx.bools("any_disabled", p)?;
        let raw = kernel::zip_with(&rent, &income, |r, i| r - rate * i);
        let capped = kernel::min_of(&[&raw, &[ceiling]]);
        let boosted = kernel::select(&disabled, &kernel::scale(&capped, 1.5), &capped);
        Ok((p, Value::from(kernel::round_half_away(&kernel::clamp_min(&boosted, 0.0)))))
    }))
    .unwrap();
    reg
}

#[test]
fn test_household_scenario() {
    let reg = household_registry();
    let leg = Legislation::builder()
        .set("housing.ceiling", date(2000, 1, 1), 500.0)
        .set("housing.rate", date(2000, 1, 1), 0.25)
        .build()
        .unwrap();
    let pop = two_households();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    let y = year(2013);
    sim.set_input("income", y, vec![1000.0, 600.0, 0.0, 200.0]).unwrap();
    sim.set_input("disabled", y, vec![false, false, true, false]).unwrap();
    sim.set_input("rent", y, vec![700.0, 900.0]).unwrap();

    assert_eq!(sim.calculate("household_income", y).unwrap(), Value::from(vec![1600.0, 200.0]));
    assert_eq!(sim.calculate("any_disabled", y).unwrap(), Value::from(vec![true, false]));
    assert_eq!(sim.calculate("rent_paid", y).unwrap(), Value::from(vec![700.0, 0.0, 0.0, 900.0]));
    // Household 0: 700 - 400 = 300, boosted to 450. Household 1: 900 - 50 = 850, capped at 500.
    assert_eq!(sim.calculate("housing_aid", y).unwrap(), Value::from(vec![450.0, 500.0]));

    let order = sim.topology().evaluation_order().unwrap();
    let aid = sim.cache_key("housing_aid", y).unwrap();
    let income = sim.cache_key("household_income", y).unwrap();
    let pos = |k: levy_core::CacheKey| order.iter().position(|x| *x == k).unwrap();
    assert!(pos(income) < pos(aid));
}

#[test]
fn test_inputs_are_validated() {
    let reg = household_registry();
    let leg = Legislation::new();
    let pop = two_households();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    let y = year(2013);

    assert!(matches!(
        sim.set_input("income", y, vec![1.0, 2.0]),
        Err(ComputationError::ShapeMismatch { expected: 4, actual: 2, .. })
    ));
    assert!(matches!(
        sim.set_input("income", y, vec![true; 4]),
        Err(ComputationError::TypeMismatch { .. })
    ));
    assert!(matches!(
        sim.set_input("income", Period::month(2013, 1).unwrap(), vec![0.0; 4]),
        Err(ComputationError::PeriodMismatch { .. })
    ));
    sim.set_input("income", y, vec![0.0; 4]).unwrap();
    assert!(matches!(
        sim.set_input("income", y, vec![0.0; 4]),
        Err(ComputationError::InputConflict { .. })
    ));
    assert!(matches!(
        sim.set_input("nope", y, vec![0.0; 4]),
        Err(ComputationError::Registry(RegistryError::UnknownVariable { .. }))
    ));
    // An input nobody supplied reads as its default.
    assert_eq!(sim.calculate("rent", y).unwrap(), Value::from(vec![0.0, 0.0]));
}

#[test]
fn test_formula_output_is_validated() {
    let mut reg = Registry::new();
    reg.register(
        Variable::float("short", EntityKind::Person, PeriodUnit::Year)
            .variant(date(2000, 1, 1), None, |_, p| Ok((p, Value::from(vec![1.0])))),
    )
    .unwrap();
    reg.register(
        Variable::float("orphan", EntityKind::group("family"), PeriodUnit::Year)
            .variant(date(2000, 1, 1), None, |_, p| Ok((p, Value::from(vec![1.0])))),
    )
    .unwrap();
    let leg = Legislation::new();
    let pop = two_households();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    assert!(matches!(
        sim.calculate("short", year(2013)),
        Err(ComputationError::ShapeMismatch { expected: 4, actual: 1, .. })
    ));
    assert!(matches!(sim.calculate("orphan", year(2013)), Err(ComputationError::UnknownEntity { .. })));
}

#[test]
fn test_adjusted_period_is_also_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut reg = Registry::new();
    // Every request is answered with the figure of the previous year.
    reg.register(Variable::float("reference_income", EntityKind::Person, PeriodUnit::Year).variant(
        date(2000, 1, 1),
        None,
        move |ctx, p| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((p.offset(-1)?, ctx.filled(&EntityKind::Person, 9.0)?))
        },
    ))
    .unwrap();
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    sim.calculate("reference_income", year(2013)).unwrap();
    assert_eq!(sim.calculate("reference_income", year(2012)).unwrap(), Value::from(vec![9.0]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_calculate_many_isolates_failures() {
    let reg = versioned(false);
    let leg = Legislation::new();
    let pop = single_person();
    let mut sim = Simulation::new(&reg, &leg, &pop, EngineConfig::default());
    let results = sim.calculate_many(&[
        Request::new("allowance", year(2002)),
        Request::new("allowance", year(2010)),
        Request::new("unknown", year(2002)),
        Request::new("allowance", year(2003)).with_mode(RequestMode::Add),
    ]);
    assert_eq!(results[0], Ok(Value::from(vec![1.0])));
    assert!(matches!(results[1], Err(ComputationError::NoApplicableVariant { .. })));
    assert!(matches!(results[2], Err(ComputationError::Registry(RegistryError::UnknownVariable { .. }))));
    assert_eq!(results[3], Ok(Value::from(vec![2.0])));
}

#[test]
fn test_projection_variant_body_debug() {
    let body = VariantBody::person_to_entity("income", "household", Aggregation::Sum, None);
    assert!(format!("{:?}", body).starts_with("PersonToEntity"));
}
