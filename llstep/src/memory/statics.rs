//! Global variable storage.
//!
//! Each global's initializer tree is flattened depth-first into consecutive heap
//! cells, in declaration order. Storage for every global is reserved before any
//! cell is written, so initializers may take the address of later globals.

use crate::error::ExecError;
use crate::ir::{GlobalDecl, Initializer};
use crate::memory::{Address, Heap};
use crate::trace::Trace;
use crate::ty::{Layout, TypeResolver};
use crate::value::Value;
use std::collections::HashMap;

/// A flattened initializer cell, or a run of zero cells.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Value(Value),
    AddressOf(String),
    Uninit,
    Zeros(usize),
}

impl Slot {
    fn cells(&self) -> usize {
        match self {
            Slot::Zeros(count) => *count,
            _ => 1,
        }
    }
}

/// Lays out all globals in `heap` and returns each global's base address.
pub fn load_globals(
    globals: &[GlobalDecl],
    resolver: &TypeResolver<'_>,
    heap: &mut Heap,
    trace: &mut Trace,
) -> Result<HashMap<String, Address>, ExecError> {
    let mut pending = Vec::with_capacity(globals.len());
    let mut addresses = HashMap::with_capacity(globals.len());

    for global in globals {
        let layout = global.ty.as_ref().and_then(|ty| match resolver.resolve(ty) {
            Ok(layout) => Some(layout),
            Err(err) => {
                trace.report(err);
                None
            }
        });
        let mut slots = Vec::new();
        flatten(global, &global.init, layout.as_ref(), &mut slots, trace);
        let cells = slots
            .iter()
            .fold(0usize, |total, slot| total.saturating_add(slot.cells()));
        let base = heap.allocate(cells)?;
        addresses.insert(global.name.clone(), base);
        pending.push((base, slots));
    }

    for (base, slots) in pending {
        let mut address = base;
        for slot in slots {
            let cells = slot.cells();
            let value = match slot {
                Slot::Value(value) => Some(value),
                Slot::AddressOf(name) => match addresses.get(&name) {
                    Some(target) => Some(Value::Int(*target as i64)),
                    None => {
                        trace.report(ExecError::UndefinedGlobal { name });
                        Some(Value::ZERO)
                    }
                },
                Slot::Uninit => None,
                Slot::Zeros(count) => {
                    for offset in 0..count {
                        heap.write(address + offset, Value::ZERO)?;
                    }
                    None
                }
            };
            if let Some(value) = value {
                heap.write(address, value)?;
            }
            address += cells;
        }
    }
    Ok(addresses)
}

fn flatten(
    global: &GlobalDecl,
    init: &Initializer,
    layout: Option<&Layout>,
    slots: &mut Vec<Slot>,
    trace: &mut Trace,
) {
    match init {
        Initializer::Int(v) => slots.push(Slot::Value(Value::Int(*v))),
        Initializer::Str(s) => slots.push(Slot::Value(Value::Str(s.clone()))),
        Initializer::Null => slots.push(Slot::Value(Value::ZERO)),
        Initializer::Global(name) => slots.push(Slot::AddressOf(name.clone())),
        Initializer::Undef => slots.push(Slot::Uninit),
        Initializer::Struct(fields) => {
            let field_layouts = match layout {
                Some(Layout::Struct(layouts)) => Some(layouts),
                _ => None,
            };
            for (idx, field) in fields.iter().enumerate() {
                let field_layout = field_layouts.and_then(|layouts| layouts.get(idx));
                flatten(global, field, field_layout, slots, trace);
            }
        }
        Initializer::Zero => match layout {
            Some(layout) => slots.push(Slot::Zeros(layout.size().max(1))),
            None => {
                trace.report(ExecError::MalformedInitializer {
                    global: global.name.clone(),
                    message: "zero initializer without a known type".to_string(),
                });
                slots.push(Slot::Value(Value::ZERO));
            }
        },
    }
}
