use crate::compute::{CacheKey, Origin, Simulation, Value};
use crate::period::Period;
use crate::store::VariableRef;
use std::collections::HashMap;
use std::fmt::Write;

const SHOWN_SLOTS: usize = 4;

/// Renders the computation tree of one (variable, period) as recorded by a run.
pub fn format_trace<R: VariableRef>(sim: &Simulation<'_>, variable: R, period: Period) -> String {
    let mut tracer = Tracer { sim, visited_at_level: HashMap::new(), output: String::new() };

    match sim.cache_key(variable, period) {
        Ok(key) if sim.ledger().contains(&key) => {
            let _ = writeln!(tracer.output, "AUDIT TRACE for '{}' over {}:", tracer.name(key), key.period);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            if !sim.config().record_dependencies {
                let _ = writeln!(tracer.output, "(dependency recording is off)");
            }
            tracer.trace_key(key, 1, "");
        }
        Ok(key) => {
            let _ = writeln!(tracer.output, "Error: '{}' over {} was not computed", tracer.name(key), key.period);
        }
        Err(e) => {
            let _ = writeln!(tracer.output, "Error: {}", e);
        }
    }
    tracer.output
}

struct Tracer<'t, 'a> {
    sim: &'t Simulation<'a>,
    visited_at_level: HashMap<CacheKey, usize>,
    output: String,
}

impl<'t, 'a> Tracer<'t, 'a> {
    fn trace_key(&mut self, key: CacheKey, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&key) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(key, level);

        let marker = match self.sim.ledger().origin(&key) {
            Some(Origin::Input) => " (input)",
            Some(Origin::Default) => " (default)",
            _ => "",
        };
        let _ = writeln!(
            self.output,
            "{}[L{}] {}<{}>{}{}",
            prefix,
            level,
            self.name(key),
            key.period,
            self.format_value(key),
            marker
        );

        let children = self.sim.topology().dependencies(key);
        self.recurse_children(prefix, &children, level);
    }

    fn recurse_children(&mut self, prefix: &str, children: &[CacheKey], level: usize) {
        let stem = self.build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{} ", stem, connector);
            self.trace_key(child, level + 1, &full_prefix);
        }
    }

    fn name(&self, key: CacheKey) -> &'a str {
        self.sim.registry().get(key.variable).map_or("?", |v| v.name())
    }

    fn format_value(&self, key: CacheKey) -> String {
        match self.sim.ledger().get(&key) {
            Some(Value::Float(v)) => render(v, |x| format!("{:.3}", x)),
            Some(Value::Bool(v)) => render(v, |x| x.to_string()),
            None => "[?]".to_string(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`-- ", "    ").replace("|-- ", "|   ")
    }
}

fn render<T: Copy>(values: &[T], cell: impl Fn(T) -> String) -> String {
    let mut shown: Vec<String> = values.iter().take(SHOWN_SLOTS).map(|v| cell(*v)).collect();
    if values.len() > SHOWN_SLOTS {
        shown.push("...".to_string());
    }
    format!("[{}]", shown.join(", "))
}
