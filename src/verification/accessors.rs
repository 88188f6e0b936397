//! Mapping from field names to EEPROM accessors.
//!
//! Every persisted field is addressed by a name such as `hardware version`.
//! The name is turned into a key (lower case, words joined by `_`) and mapped
//! to a typed write/read pair of the device. Tables are built once and can be
//! validated against the fields a check needs before any hardware is touched.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::BoxFuture;

use crate::device::{Axis, EnergyMode, NodeEeprom, SensorNodeEeprom, SthEeprom, Version};
use crate::error::{IcotestError, IcotestResult};
use crate::verification::value::{FieldValue, ValueKind};

type WriteFn<D> =
    Box<dyn Fn(Arc<D>, FieldValue) -> BoxFuture<'static, IcotestResult<()>> + Send + Sync>;
type ReadFn<D> = Box<dyn Fn(Arc<D>) -> BoxFuture<'static, IcotestResult<FieldValue>> + Send + Sync>;

/// Key of a field name: lower case, whitespace runs replaced by a single `_`
pub fn accessor_key(field_name: &str) -> String {
    field_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Typed write/read pair of one field
pub struct Accessor<D: ?Sized> {
    kind: ValueKind,
    write: WriteFn<D>,
    read: ReadFn<D>,
}

impl<D: ?Sized> Accessor<D> {
    /// Kind of the values stored in the field
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Store `value` on `device`
    pub fn write(&self, device: Arc<D>, value: FieldValue) -> BoxFuture<'static, IcotestResult<()>> {
        (self.write)(device, value)
    }

    /// Read the stored value from `device`
    pub fn read(&self, device: Arc<D>) -> BoxFuture<'static, IcotestResult<FieldValue>> {
        (self.read)(device)
    }
}

/// Accessors of all fields a device type supports
pub struct AccessorTable<D: ?Sized> {
    accessors: BTreeMap<String, Accessor<D>>,
}

impl<D: ?Sized> Default for AccessorTable<D> {
    fn default() -> Self {
        Self {
            accessors: BTreeMap::new(),
        }
    }
}

impl<D: ?Sized + Send + Sync + 'static> AccessorTable<D> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the accessors of `field_name`
    ///
    /// A later registration of the same key replaces the earlier one.
    pub fn register<W, R>(mut self, field_name: &str, kind: ValueKind, write: W, read: R) -> Self
    where
        W: Fn(Arc<D>, FieldValue) -> BoxFuture<'static, IcotestResult<()>> + Send + Sync + 'static,
        R: Fn(Arc<D>) -> BoxFuture<'static, IcotestResult<FieldValue>> + Send + Sync + 'static,
    {
        self.accessors.insert(
            accessor_key(field_name),
            Accessor {
                kind,
                write: Box::new(write),
                read: Box::new(read),
            },
        );
        self
    }

    /// Accessors of `field_name`
    ///
    /// # Errors
    /// Returns [`IcotestError::UnknownField`] if no accessors are registered.
    pub fn get(&self, field_name: &str) -> IcotestResult<&Accessor<D>> {
        self.accessors
            .get(&accessor_key(field_name))
            .ok_or_else(|| IcotestError::UnknownField {
                name: field_name.to_string(),
            })
    }

    /// Check that accessors exist for every field in `field_names`
    pub fn validate<S: AsRef<str>>(&self, field_names: &[S]) -> IcotestResult<()> {
        field_names
            .iter()
            .try_for_each(|name| self.get(name.as_ref()).map(|_| ()))
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(String::as_str)
    }
}

/// Extraction of a typed value out of a [`FieldValue`]
trait FromField: Sized {
    const KIND: ValueKind;

    fn from_field(value: FieldValue) -> Option<Self>;
}

impl FromField for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl FromField for u64 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Number(number) => Some(number),
            _ => None,
        }
    }
}

impl FromField for Version {
    const KIND: ValueKind = ValueKind::Version;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Version(version) => Some(version),
            _ => None,
        }
    }
}

impl FromField for Duration {
    const KIND: ValueKind = ValueKind::Duration;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Duration(duration) => Some(duration),
            _ => None,
        }
    }
}

impl FromField for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(value) => Some(value),
            _ => None,
        }
    }
}

impl FromField for NaiveDate {
    const KIND: ValueKind = ValueKind::Date;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Date(date) => Some(date),
            _ => None,
        }
    }
}

fn take<T: FromField>(field: &str, value: FieldValue) -> IcotestResult<T> {
    let actual = value.kind();
    T::from_field(value).ok_or_else(|| IcotestError::KindMismatch {
        field: field.to_string(),
        expected: T::KIND,
        actual,
    })
}

fn batch_number(value: FieldValue) -> IcotestResult<u32> {
    let number: u64 = take("batch number", value)?;
    u32::try_from(number).map_err(|_| {
        IcotestError::Configuration(format!("Batch number {number} does not fit into 32 bits"))
    })
}

impl<D: NodeEeprom + ?Sized + 'static> AccessorTable<D> {
    /// Fields shared by all nodes
    pub fn node() -> Self {
        Self::new()
            .register(
                "GTIN",
                ValueKind::Number,
                |node: Arc<D>, value| {
                    Box::pin(async move { Ok(node.write_gtin(take("GTIN", value)?).await?) })
                },
                |node: Arc<D>| Box::pin(async move { Ok(node.read_gtin().await?.into()) }),
            )
            .register(
                "hardware version",
                ValueKind::Version,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let version = take("hardware version", value)?;
                        Ok(node.write_hardware_version(version).await?)
                    })
                },
                |node: Arc<D>| {
                    Box::pin(async move { Ok(node.read_hardware_version().await?.into()) })
                },
            )
            .register(
                "firmware version",
                ValueKind::Version,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let version = take("firmware version", value)?;
                        Ok(node.write_firmware_version(version).await?)
                    })
                },
                |node: Arc<D>| {
                    Box::pin(async move { Ok(node.read_firmware_version().await?.into()) })
                },
            )
            .register(
                "release name",
                ValueKind::Text,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let name: String = take("release name", value)?;
                        Ok(node.write_release_name(&name).await?)
                    })
                },
                |node: Arc<D>| Box::pin(async move { Ok(node.read_release_name().await?.into()) }),
            )
            .register(
                "serial number",
                ValueKind::Text,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let serial_number: String = take("serial number", value)?;
                        Ok(node.write_serial_number(&serial_number).await?)
                    })
                },
                |node: Arc<D>| {
                    Box::pin(async move { Ok(node.read_serial_number().await?.into()) })
                },
            )
            .register(
                "product name",
                ValueKind::Text,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let name: String = take("product name", value)?;
                        Ok(node.write_product_name(&name).await?)
                    })
                },
                |node: Arc<D>| Box::pin(async move { Ok(node.read_product_name().await?.into()) }),
            )
            .register(
                "batch number",
                ValueKind::Number,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let batch = batch_number(value)?;
                        Ok(node.write_batch_number(batch).await?)
                    })
                },
                |node: Arc<D>| Box::pin(async move { Ok(node.read_batch_number().await?.into()) }),
            )
            .register(
                "production date",
                ValueKind::Date,
                |node: Arc<D>, value| {
                    Box::pin(async move {
                        let date = take("production date", value)?;
                        Ok(node.write_production_date(date).await?)
                    })
                },
                |node: Arc<D>| {
                    Box::pin(async move { Ok(node.read_production_date().await?.into()) })
                },
            )
    }
}

impl<D: SensorNodeEeprom + ?Sized + 'static> AccessorTable<D> {
    /// Fields of sensor nodes, including the ones shared by all nodes
    pub fn sensor_node() -> Self {
        let table = Self::node().register(
            "name",
            ValueKind::Text,
            |node: Arc<D>, value| {
                Box::pin(async move {
                    let name: String = take("name", value)?;
                    Ok(node.write_name(&name).await?)
                })
            },
            |node: Arc<D>| Box::pin(async move { Ok(node.read_name().await?.into()) }),
        );

        [EnergyMode::Reduced, EnergyMode::Lowest]
            .into_iter()
            .fold(table, |table, mode| {
                table
                    .register(
                        &format!("advertisement time {}", mode.number()),
                        ValueKind::Duration,
                        move |node: Arc<D>, value| {
                            Box::pin(async move {
                                let time = take("advertisement time", value)?;
                                Ok(node.write_advertisement_time(mode, time).await?)
                            })
                        },
                        move |node: Arc<D>| {
                            Box::pin(async move {
                                Ok(node.read_advertisement_time(mode).await?.into())
                            })
                        },
                    )
                    .register(
                        &format!("sleep time {}", mode.number()),
                        ValueKind::Duration,
                        move |node: Arc<D>, value| {
                            Box::pin(async move {
                                let time = take("sleep time", value)?;
                                Ok(node.write_sleep_time(mode, time).await?)
                            })
                        },
                        move |node: Arc<D>| {
                            Box::pin(async move { Ok(node.read_sleep_time(mode).await?.into()) })
                        },
                    )
            })
    }
}

impl<D: SthEeprom + ?Sized + 'static> AccessorTable<D> {
    /// Fields of the STH, including all sensor node fields
    pub fn sth() -> Self {
        Axis::ALL.into_iter().fold(Self::sensor_node(), |table, axis| {
            table
                .register(
                    &format!("acceleration slope {axis}"),
                    ValueKind::Float,
                    move |node: Arc<D>, value| {
                        Box::pin(async move {
                            let slope = take("acceleration slope", value)?;
                            Ok(node.write_acceleration_slope(axis, slope).await?)
                        })
                    },
                    move |node: Arc<D>| {
                        Box::pin(async move {
                            Ok(node.read_acceleration_slope(axis).await?.into())
                        })
                    },
                )
                .register(
                    &format!("acceleration offset {axis}"),
                    ValueKind::Float,
                    move |node: Arc<D>, value| {
                        Box::pin(async move {
                            let offset = take("acceleration offset", value)?;
                            Ok(node.write_acceleration_offset(axis, offset).await?)
                        })
                    },
                    move |node: Arc<D>| {
                        Box::pin(async move {
                            Ok(node.read_acceleration_offset(axis).await?.into())
                        })
                    },
                )
        })
    }
}
