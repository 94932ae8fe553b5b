//! Context assembly and field resolution.
//!
//! Builds the per-employee, per-period snapshot that conditions and
//! formulas evaluate against, and resolves dotted field paths over it.

pub mod builder;
pub mod sources;
pub mod view;

pub use builder::{ContextBuilder, ContextSources, tenure_between};
pub use sources::{
    AdvanceSource, AggregationSource, AttendanceSource, ContractSource, CustodySource,
    DisciplinaryRecord, DisciplinarySource, EmployeeDirectory, EmployeeRecord, LeaveSource,
    OrgCatalog, OrgUnitRecord,
};
pub use view::{AggregateQuery, ContextView};
