// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Common ORC errors and macros.

use std::error::Error;

use arrow_schema::ArrowError;

/// ORC error enumeration
///
/// Stream decoding never fails: malformed or truncated streams degrade to short
/// batches and null rows. Errors are only raised when the descriptors handed to
/// the engine are inconsistent, or when decoded columns are converted to Arrow.
#[derive(Debug)]
#[non_exhaustive]
pub enum OrcError {
    /// General ORC error.
    /// Returned when code violates normal workflow of working with ORC streams.
    General(String),
    /// "Not yet implemented" ORC error.
    /// Returned when functionality is not yet available.
    NYI(String),
    /// Descriptor or stream content that the ORC format does not allow.
    OutOfSpec(String),
    /// An index was out of bounds: (index, bound).
    IndexOutOfBound(usize, usize),
    /// Arrow error.
    /// Returned when building arrays from decoded columns fails.
    ArrowError(String),
    /// An external error variant
    External(Box<dyn Error + Send + Sync>),
}

impl std::fmt::Display for OrcError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self {
            OrcError::General(message) => write!(fmt, "ORC error: {message}"),
            OrcError::NYI(message) => write!(fmt, "NYI: {message}"),
            OrcError::OutOfSpec(message) => write!(fmt, "Out of spec: {message}"),
            OrcError::IndexOutOfBound(index, bound) => {
                write!(fmt, "Index {index} out of bound: {bound}")
            }
            OrcError::ArrowError(message) => write!(fmt, "Arrow: {message}"),
            OrcError::External(e) => write!(fmt, "External: {e}"),
        }
    }
}

impl Error for OrcError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OrcError::External(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ArrowError> for OrcError {
    fn from(e: ArrowError) -> OrcError {
        OrcError::ArrowError(e.to_string())
    }
}

/// A specialized `Result` for ORC errors.
pub type Result<T, E = OrcError> = std::result::Result<T, E>;

// ----------------------------------------------------------------------
// Conversion from `OrcError` to other types of `Error`s

impl From<OrcError> for ArrowError {
    fn from(e: OrcError) -> Self {
        ArrowError::ExternalError(Box::new(e))
    }
}

// ----------------------------------------------------------------------
// Convenient macros for different errors

macro_rules! general_err {
    ($fmt:expr) => (OrcError::General($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (OrcError::General(format!($fmt, $($args),*)));
}

macro_rules! nyi_err {
    ($fmt:expr) => (OrcError::NYI($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (OrcError::NYI(format!($fmt, $($args),*)));
}

macro_rules! out_of_spec_err {
    ($fmt:expr) => (OrcError::OutOfSpec($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (OrcError::OutOfSpec(format!($fmt, $($args),*)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = general_err!("bad descriptor {}", 3);
        assert_eq!(e.to_string(), "ORC error: bad descriptor 3");

        let e = nyi_err!("dictionary encoding for INT");
        assert_eq!(e.to_string(), "NYI: dictionary encoding for INT");

        let e = out_of_spec_err!("patch width {} too wide", 72);
        assert_eq!(e.to_string(), "Out of spec: patch width 72 too wide");

        let e = OrcError::IndexOutOfBound(10, 4);
        assert_eq!(e.to_string(), "Index 10 out of bound: 4");
    }

    #[test]
    fn test_error_source() {
        let bytes = vec![0xff, 0xfe];
        let utf8 = String::from_utf8(bytes).unwrap_err();
        let e = OrcError::External(Box::new(utf8));
        assert!(e.source().is_some());
        assert!(general_err!("x").source().is_none());
    }

    #[test]
    fn test_arrow_error_round_trip() {
        let e: OrcError = ArrowError::ComputeError("boom".to_string()).into();
        assert!(matches!(e, OrcError::ArrowError(_)));
        let back: ArrowError = e.into();
        assert!(matches!(back, ArrowError::ExternalError(_)));
    }
}
