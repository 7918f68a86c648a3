//! Lookup-table helper enums mapping to SMALLSERIAL/SMALLINT tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding database table.

/// Lookup ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database lookup ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Curation job execution status.
    ///
    /// The seeded names (`PENDING`, `PROCESSING`, `FINISHED`, `ERROR`,
    /// `UNPROCESSED`) are an external contract: they appear verbatim in
    /// API responses and job status events.
    JobStatus {
        Pending = 1,
        Processing = 2,
        Finished = 3,
        Error = 4,
        Unprocessed = 5,
    }
}

impl JobStatus {
    /// The seeded name for this status.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Finished => "FINISHED",
            JobStatus::Error => "ERROR",
            JobStatus::Unprocessed => "UNPROCESSED",
        }
    }

    /// Reverse lookup from a database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(JobStatus::Pending),
            2 => Some(JobStatus::Processing),
            3 => Some(JobStatus::Finished),
            4 => Some(JobStatus::Error),
            5 => Some(JobStatus::Unprocessed),
            _ => None,
        }
    }
}

define_status_enum! {
    /// Saved cohort query lifecycle status.
    QueryStatus {
        Saved = 1,
        Running = 2,
        Completed = 3,
        Error = 4,
    }
}

impl QueryStatus {
    /// The seeded name for this status.
    pub fn name(self) -> &'static str {
        match self {
            QueryStatus::Saved => "SAVED",
            QueryStatus::Running => "RUNNING",
            QueryStatus::Completed => "COMPLETED",
            QueryStatus::Error => "ERROR",
        }
    }
}

define_status_enum! {
    /// Study data category.
    StudyType {
        Sensor = 1,
        Clinical = 2,
        Any = 3,
    }
}

impl StudyType {
    /// Reverse lookup from a database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(StudyType::Sensor),
            2 => Some(StudyType::Clinical),
            3 => Some(StudyType::Any),
            _ => None,
        }
    }
}

define_status_enum! {
    /// Field dictionary value type.
    FieldDataType {
        Integer = 1,
        Decimal = 2,
        String = 3,
        Boolean = 4,
        Datetime = 5,
        Categorical = 6,
    }
}

impl FieldDataType {
    /// Reverse lookup from a database ID.
    pub fn from_id(id: StatusId) -> Option<Self> {
        match id {
            1 => Some(FieldDataType::Integer),
            2 => Some(FieldDataType::Decimal),
            3 => Some(FieldDataType::String),
            4 => Some(FieldDataType::Boolean),
            5 => Some(FieldDataType::Datetime),
            6 => Some(FieldDataType::Categorical),
            _ => None,
        }
    }

    /// The short code used in field-definition CSV uploads.
    pub fn code(self) -> &'static str {
        match self {
            FieldDataType::Integer => "int",
            FieldDataType::Decimal => "dec",
            FieldDataType::String => "str",
            FieldDataType::Boolean => "bool",
            FieldDataType::Datetime => "date",
            FieldDataType::Categorical => "cat",
        }
    }

    /// Reverse lookup from a CSV short code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "int" => Some(FieldDataType::Integer),
            "dec" => Some(FieldDataType::Decimal),
            "str" => Some(FieldDataType::String),
            "bool" => Some(FieldDataType::Boolean),
            "date" => Some(FieldDataType::Datetime),
            "cat" => Some(FieldDataType::Categorical),
            _ => None,
        }
    }
}
