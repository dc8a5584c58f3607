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

//! Conversion of decoded output columns into arrow arrays.

use std::sync::Arc;

use arrow_array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, StringArray, TimestampNanosecondArray,
};
use arrow_buffer::{Buffer, NullBuffer, OffsetBuffer};
use arrow_schema::{DataType, TimeUnit};

use crate::column::{ColumnBuffer, OutputColumn, TypeKind, ValidityBitmap};
use crate::errors::{OrcError, Result};

/// Arrow type an ORC column of `type_kind` is converted to
pub fn arrow_data_type(type_kind: TypeKind) -> DataType {
    match type_kind {
        TypeKind::Boolean => DataType::Boolean,
        TypeKind::Byte => DataType::Int8,
        TypeKind::Short => DataType::Int16,
        TypeKind::Int => DataType::Int32,
        TypeKind::Long => DataType::Int64,
        TypeKind::Float => DataType::Float32,
        TypeKind::Double => DataType::Float64,
        TypeKind::String | TypeKind::Varchar | TypeKind::Char => DataType::Utf8,
        TypeKind::Binary => DataType::Binary,
        TypeKind::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, None),
        TypeKind::Date => DataType::Date32,
        TypeKind::Decimal => DataType::Float64,
    }
}

fn byte_offsets(values: &[&[u8]]) -> Result<(OffsetBuffer<i32>, Buffer)> {
    let total: usize = values.iter().map(|v| v.len()).sum();
    if total > i32::MAX as usize {
        return Err(OrcError::IndexOutOfBound(total, i32::MAX as usize));
    }
    let offsets = OffsetBuffer::from_lengths(values.iter().map(|v| v.len()));
    let mut bytes = Vec::with_capacity(total);
    for v in values {
        bytes.extend_from_slice(v);
    }
    Ok((offsets, Buffer::from_vec(bytes)))
}

impl OutputColumn<'_> {
    /// Converts the decoded column of `type_kind` into an arrow array.
    ///
    /// String columns are validated as UTF-8, BINARY columns are not.
    /// Decimals become `Float64`, dates `Date32` or `Date64` depending on the
    /// buffer they were decoded into.
    pub fn into_array(self, type_kind: TypeKind) -> Result<ArrayRef> {
        let (mut buffer, validity) = self.into_parts();
        if !buffer.as_data_mut().accepts(type_kind) {
            return Err(general_err!(
                "cannot convert a {} buffer to a {} array",
                buffer.as_data_mut().variant_name(),
                type_kind
            ));
        }
        let nulls: Option<NullBuffer> = validity
            .as_ref()
            .map(ValidityBitmap::to_null_buffer)
            .filter(|n| n.null_count() > 0);

        let array: ArrayRef = match buffer {
            ColumnBuffer::Boolean(v) => Arc::new(BooleanArray::new(v.into_iter().collect(), nulls)),
            ColumnBuffer::Int8(v) => Arc::new(Int8Array::new(v.into(), nulls)),
            ColumnBuffer::Int16(v) => Arc::new(Int16Array::new(v.into(), nulls)),
            ColumnBuffer::Int32(v) => Arc::new(Int32Array::new(v.into(), nulls)),
            ColumnBuffer::Int64(v) => Arc::new(Int64Array::new(v.into(), nulls)),
            ColumnBuffer::Float32(v) => Arc::new(Float32Array::new(v.into(), nulls)),
            ColumnBuffer::Float64(v) | ColumnBuffer::Decimal(v) => {
                Arc::new(Float64Array::new(v.into(), nulls))
            }
            ColumnBuffer::TimestampNanos(v) => Arc::new(TimestampNanosecondArray::new(v.into(), nulls)),
            ColumnBuffer::Date32(v) => Arc::new(Date32Array::new(v.into(), nulls)),
            ColumnBuffer::Date64(v) => Arc::new(Date64Array::new(v.into(), nulls)),
            ColumnBuffer::Bytes(v) => {
                let (offsets, values) = byte_offsets(&v)?;
                if type_kind == TypeKind::Binary {
                    Arc::new(BinaryArray::try_new(offsets, values, nulls)?)
                } else {
                    Arc::new(StringArray::try_new(offsets, values, nulls)?)
                }
            }
        };
        Ok(array)
    }
}
