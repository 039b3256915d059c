//! Compilation scope (§4.9, §6).
//!
//! `in_select`/`in_join` are copied at each derivation — they describe where
//! in the tree we currently are, and a child scope's position shouldn't leak
//! back to its parent. The CTE registry and the unique-name counter are
//! different: every node compiled during one top-level `compile()` call must
//! mint names from the same counter and register into the same `WITH` list,
//! so those two fields are shared via `Rc<RefCell<_>>` across every `Context`
//! derived from the root. `Context` holds no locks and is never handed across
//! a thread boundary; the `Rc`s make that a compile error, not a convention.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;

use crate::ast::table::{TableNode, TableRef};
use crate::compiler::dialect::DialectHandler;
use crate::compiler::{Compilable, Options};
use crate::error::Error;
use crate::utils::id_gen::NameGenerator;
use crate::utils::IntoOnly;

#[derive(Clone)]
pub struct Context {
    dialect: Rc<dyn DialectHandler>,
    options: Rc<Options>,
    in_select: bool,
    in_join: bool,
    /// Every alias a table identity has been registered under within the
    /// current scope. Normally just one; more than one means the same table
    /// object entered the same `FROM` scope twice (e.g. an un-aliased
    /// self-join), which makes an unqualified reference to it ambiguous.
    aliases: Rc<RefCell<HashMap<usize, Vec<String>>>>,
    subqueries: Rc<RefCell<Vec<(String, String)>>>,
    names: Rc<RefCell<NameGenerator>>,
}

impl Context {
    pub fn root(dialect: Rc<dyn DialectHandler>, options: Options) -> Context {
        Context {
            dialect,
            options: Rc::new(options),
            in_select: false,
            in_join: false,
            aliases: Rc::new(RefCell::new(HashMap::new())),
            subqueries: Rc::new(RefCell::new(Vec::new())),
            names: Rc::new(RefCell::new(NameGenerator::new("tmp"))),
        }
    }

    pub fn dialect(&self) -> &dyn DialectHandler {
        self.dialect.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn quote(&self, name: &str) -> String {
        self.dialect.quote(name)
    }

    pub fn in_join(&self) -> bool {
        self.in_join
    }

    /// A fresh scope for compiling a `SELECT` body: column references are no
    /// longer forced to qualify with a table alias, and the alias registry
    /// starts empty (aliases are only meaningful within the `FROM` clause
    /// that introduced them).
    pub fn entering_select(&self) -> Context {
        let mut ctx = self.clone();
        ctx.in_select = true;
        ctx.in_join = false;
        ctx.aliases = Rc::new(RefCell::new(HashMap::new()));
        ctx
    }

    /// A scope for compiling a `JOIN`'s two sides and `ON` clause: column
    /// references must be qualified, since both sides are in scope at once.
    pub fn entering_join(&self) -> Context {
        let mut ctx = self.clone();
        ctx.in_join = true;
        ctx
    }

    pub fn fresh_name(&self) -> String {
        self.names.borrow_mut().gen()
    }

    fn identity(table: &TableRef) -> usize {
        Rc::as_ptr(table) as usize
    }

    pub fn register_alias(&self, table: &TableRef, alias: String) {
        self.aliases
            .borrow_mut()
            .entry(Self::identity(table))
            .or_default()
            .push(alias);
    }

    fn aliases_for(&self, table: &TableRef) -> Vec<String> {
        self.aliases.borrow().get(&Self::identity(table)).cloned().unwrap_or_default()
    }

    /// Compiles `table` into a `FROM`-clause item, registering whatever alias
    /// it becomes known by so columns selected from it can be qualified.
    pub fn compile_from(&self, table: &TableRef) -> Result<String> {
        match table.as_ref() {
            TableNode::Path { path, .. } => {
                let sql = self.dialect.compile_path(path);
                let alias = path.last().cloned().unwrap_or_default();
                self.register_alias(table, alias);
                Ok(sql)
            }
            TableNode::Alias { name, .. } => {
                let sql = table.compile(self)?;
                self.register_alias(table, name.clone());
                Ok(sql)
            }
            TableNode::Cte { name, .. } => {
                let sql = table.compile(self)?;
                self.register_alias(table, name.clone());
                Ok(sql)
            }
            _ => {
                let derived = self.compile_derived(table)?;
                let alias = self.fresh_name();
                self.register_alias(table, alias.clone());
                Ok(format!("{derived} AS {}", self.quote(&alias)))
            }
        }
    }

    /// Compiles `table` as a value to be embedded inline: a bare path
    /// compiles unwrapped, everything else is parenthesized.
    pub fn compile_derived(&self, table: &TableRef) -> Result<String> {
        match table.as_ref() {
            TableNode::Path { .. } => table.compile(self),
            _ => Ok(format!("({})", table.compile(self)?)),
        }
    }

    /// Compiles `table` as the body of a CTE, registers it under `name`, and
    /// returns the quoted name to use at the reference site.
    pub fn compile_cte(&self, table: &TableRef, name: &str) -> Result<String> {
        let mut inner = self.clone();
        inner.in_select = false;
        inner.in_join = false;
        inner.aliases = Rc::new(RefCell::new(HashMap::new()));
        let sql = table.compile(&inner)?;
        let mut subqueries = self.subqueries.borrow_mut();
        subqueries.retain(|(n, _)| n != name);
        subqueries.push((name.to_string(), sql));
        Ok(self.quote(name))
    }

    pub fn compile_column(&self, source_table: &TableRef, name: &str) -> Result<String> {
        if self.in_join {
            let aliases = self.aliases_for(source_table);
            if !aliases.is_empty() {
                let alias = aliases
                    .into_only()
                    .map_err(|_| Error::ambiguous(name))?;
                return Ok(format!("{}.{}", self.quote(&alias), self.quote(name)));
            }
        }
        Ok(self.quote(name))
    }

    /// Drains the registered CTEs as `(name, body_sql)` pairs, in registration order.
    pub fn take_ctes(&self) -> Vec<(String, String)> {
        std::mem::take(&mut self.subqueries.borrow_mut())
    }
}
