//! Scripted native driver shared by the integration tests.
//!
//! The script cell is shared between the test and every handle the driver
//! produces, so a test can both steer native behavior (forced failures,
//! affected-row counts) and observe what the adapter asked the native
//! layer to do.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use oci_dbal_rs::{
    ConnectSpec, Connection, DescriptorKind, NativeConnection, NativeDriver, NativeError,
    NativeStatement, NoLookup, Options, Value,
};

#[derive(Default)]
pub struct Script {
    pub fail_connect: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    pub fail_parse: Option<NativeError>,
    pub fail_execute: Option<NativeError>,
    pub rows_affected: u64,
    pub connect_spec: Option<ConnectSpec>,
    pub committed: u32,
    pub rolled_back: u32,
    pub parsed: Vec<String>,
    /// `commit_on_success` flag of each native execute, in call order.
    pub executes: Vec<bool>,
    pub binds: Vec<(String, Value)>,
    pub freed: u32,
    pub last_error: Option<NativeError>,
}

#[derive(Default)]
pub struct ScriptedDriver {
    pub script: Rc<RefCell<Script>>,
}

impl ScriptedDriver {
    pub fn new() -> (Self, Rc<RefCell<Script>>) {
        let driver = Self::default();
        let script = driver.script.clone();
        (driver, script)
    }
}

pub struct ScriptedConn {
    script: Rc<RefCell<Script>>,
}

pub struct ScriptedStmt {
    script: Rc<RefCell<Script>>,
    rows: u64,
}

impl NativeDriver for ScriptedDriver {
    type Conn = ScriptedConn;

    fn connect(&self, spec: &ConnectSpec) -> Result<ScriptedConn, NativeError> {
        let mut script = self.script.borrow_mut();
        script.connect_spec = Some(spec.clone());
        if script.fail_connect {
            return Err(NativeError::new(
                12154,
                "TNS:could not resolve the connect identifier specified",
            ));
        }
        Ok(ScriptedConn {
            script: self.script.clone(),
        })
    }
}

impl NativeConnection for ScriptedConn {
    type Stmt = ScriptedStmt;
    type Descriptor = u32;

    fn parse(&mut self, sql: &str) -> Result<ScriptedStmt, NativeError> {
        let mut script = self.script.borrow_mut();
        if let Some(err) = script.fail_parse.clone() {
            script.last_error = Some(err.clone());
            return Err(err);
        }
        script.parsed.push(sql.to_string());
        Ok(ScriptedStmt {
            script: self.script.clone(),
            rows: script.rows_affected,
        })
    }

    fn commit(&mut self) -> Result<(), NativeError> {
        let mut script = self.script.borrow_mut();
        if script.fail_commit {
            let err = NativeError::new(2091, "transaction rolled back");
            script.last_error = Some(err.clone());
            return Err(err);
        }
        script.committed += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), NativeError> {
        let mut script = self.script.borrow_mut();
        if script.fail_rollback {
            let err = NativeError::new(1033, "ORACLE initialization or shutdown in progress");
            script.last_error = Some(err.clone());
            return Err(err);
        }
        script.rolled_back += 1;
        Ok(())
    }

    fn last_error(&self) -> Option<NativeError> {
        self.script.borrow().last_error.clone()
    }

    fn new_cursor(&mut self) -> Result<ScriptedStmt, NativeError> {
        Ok(ScriptedStmt {
            script: self.script.clone(),
            rows: 0,
        })
    }

    fn new_descriptor(&mut self, kind: DescriptorKind) -> Result<u32, NativeError> {
        Ok(kind.code())
    }

    fn free_statement(&mut self, _stmt: ScriptedStmt) {
        self.script.borrow_mut().freed += 1;
    }
}

impl NativeStatement for ScriptedStmt {
    fn execute(&mut self, commit_on_success: bool) -> Result<(), NativeError> {
        let mut script = self.script.borrow_mut();
        if let Some(err) = script.fail_execute.clone() {
            script.last_error = Some(err.clone());
            return Err(err);
        }
        script.executes.push(commit_on_success);
        Ok(())
    }

    fn row_count(&self) -> u64 {
        self.rows
    }

    fn bind_by_name(&mut self, name: &str, value: Value) -> Result<(), NativeError> {
        self.script
            .borrow_mut()
            .binds
            .push((name.to_string(), value));
        Ok(())
    }
}

/// Connect with an everyday DSN and no options.
pub fn connect(driver: &ScriptedDriver) -> Connection<ScriptedDriver> {
    Connection::connect(
        driver,
        "oci://dbhost:1521/XE",
        "scott",
        "tiger",
        Options::new(),
        &NoLookup,
    )
    .expect("scripted connect should succeed")
}
