//! Persisted board configuration.
//!
//! The only item today is the board side, stored as an `i8` under
//! [`ConfigKey::BoardSide`]. [`FlashConfigStore`] keeps it in a
//! `sequential-storage` map on the last sectors of the flash.

use core::future::Future;
#[cfg(feature = "storage")]
use core::ops::Range;

#[cfg(feature = "storage")]
use {
    crate::config::StorageConfig,
    embassy_embedded_hal::adapter::BlockingAsync,
    embedded_storage::nor_flash::NorFlash,
    embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash,
    sequential_storage::Error as SSError,
    sequential_storage::cache::NoCache,
    sequential_storage::erase_all,
    sequential_storage::map::{fetch_item, store_item},
};

use crate::layout::BoardSide;

/// Keys of the persisted items
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigKey {
    BoardSide = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The flash driver failed
    Flash,
    /// The stored data can't be parsed
    Corrupted,
    FullStorage,
    /// Buffer too small, needs the given number of bytes
    BufferTooSmall(usize),
    Serialization,
    Other,
}

/// Durable key-value store holding `i8` settings.
pub trait ConfigStore {
    /// Read the value of `key`, `Ok(None)` if it was never written.
    fn get(&mut self, key: ConfigKey) -> impl Future<Output = Result<Option<i8>, StorageError>>;

    /// Persist `value` under `key`.
    fn set(&mut self, key: ConfigKey, value: i8) -> impl Future<Output = Result<(), StorageError>>;
}

/// Resolves and persists which half of the keyboard this board is.
pub struct SideSelector;

impl SideSelector {
    /// Read the configured side once at startup.
    ///
    /// A missing value is initialized to [`BoardSide::Left`] and written back.
    /// Read failures and unknown values fall back to the left side.
    pub async fn load<S: ConfigStore>(store: &mut S) -> BoardSide {
        let side = match store.get(ConfigKey::BoardSide).await {
            Ok(Some(value)) => match BoardSide::from_config_value(value) {
                Some(side) => side,
                None => {
                    warn!("Unknown board side {} in storage, using left", value);
                    BoardSide::Left
                }
            },
            Ok(None) => {
                warn!("Board side isn't configured, initializing it to left");
                if let Err(e) = store.set(ConfigKey::BoardSide, BoardSide::Left.config_value()).await {
                    warn!("Failed to save the default board side: {:?}", e);
                }
                BoardSide::Left
            }
            Err(e) => {
                error!("Failed to read board side: {:?}", e);
                BoardSide::Left
            }
        };
        info!("Board side: {:?}", side);
        side
    }

    /// Persist a new side, any non-zero value selects the right half.
    ///
    /// Takes effect at the next startup.
    pub async fn store<S: ConfigStore>(store: &mut S, value: i8) -> Result<BoardSide, StorageError> {
        let side = if value == 0 { BoardSide::Left } else { BoardSide::Right };
        store.set(ConfigKey::BoardSide, side.config_value()).await?;
        info!("Board side saved: {:?}", side);
        Ok(side)
    }
}

/// Wrap a blocking flash so it can back a [`FlashConfigStore`]
#[cfg(feature = "storage")]
pub fn async_flash_wrapper<F: NorFlash>(flash: F) -> BlockingAsync<F> {
    embassy_embedded_hal::adapter::BlockingAsync::new(flash)
}

#[cfg(feature = "storage")]
const STORAGE_BUFFER_SIZE: usize = 64;

/// [`ConfigStore`] backed by a `sequential-storage` map on NOR flash.
#[cfg(feature = "storage")]
pub struct FlashConfigStore<F: AsyncNorFlash> {
    flash: F,
    storage_range: Range<u32>,
    buffer: [u8; STORAGE_BUFFER_SIZE],
}

#[cfg(feature = "storage")]
impl<F: AsyncNorFlash> FlashConfigStore<F> {
    pub async fn new(flash: F, config: &StorageConfig) -> Self {
        let num_sectors = if config.num_sectors < 2 {
            warn!("Storage needs at least 2 sectors, got {}", config.num_sectors);
            2
        } else {
            config.num_sectors as usize
        };
        let size = num_sectors * F::ERASE_SIZE;

        // If config.start_addr == 0, use the last `num_sectors` sectors
        let storage_range = if config.start_addr == 0 {
            (flash.capacity() - size) as u32..flash.capacity() as u32
        } else {
            let start_addr = config.start_addr - config.start_addr % F::ERASE_SIZE;
            if start_addr != config.start_addr {
                warn!("Storage start 0x{:X} isn't sector aligned, using 0x{:X}", config.start_addr, start_addr);
            }
            start_addr as u32..(start_addr + size) as u32
        };

        info!(
            "Flash capacity {} KB, kvass uses {} sectors from 0x{:X} as storage",
            flash.capacity() / 1024,
            num_sectors,
            storage_range.start,
        );

        let mut storage = Self {
            flash,
            storage_range,
            buffer: [0; STORAGE_BUFFER_SIZE],
        };

        if config.clear_storage {
            debug!("Clearing storage!");
            if let Err(e) = erase_all(&mut storage.flash, storage.storage_range.clone()).await {
                print_storage_error::<F>(e);
            }
        }

        storage
    }
}

#[cfg(feature = "storage")]
impl<F: AsyncNorFlash> ConfigStore for FlashConfigStore<F> {
    async fn get(&mut self, key: ConfigKey) -> Result<Option<i8>, StorageError> {
        let read = fetch_item::<u8, i8, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(key as u8),
        )
        .await;

        match read {
            Ok(value) => Ok(value),
            Err(SSError::Corrupted { .. }) => {
                // Unreadable region, start over so the caller writes its default back
                warn!("Storage is corrupted, erasing it");
                erase_all(&mut self.flash, self.storage_range.clone())
                    .await
                    .map_err(print_storage_error::<F>)?;
                Ok(None)
            }
            Err(e) => Err(print_storage_error::<F>(e)),
        }
    }

    async fn set(&mut self, key: ConfigKey, value: i8) -> Result<(), StorageError> {
        store_item::<u8, i8, _>(
            &mut self.flash,
            self.storage_range.clone(),
            &mut NoCache::new(),
            &mut self.buffer,
            &(key as u8),
            &value,
        )
        .await
        .map_err(print_storage_error::<F>)
    }
}

#[cfg(feature = "storage")]
fn print_storage_error<F: AsyncNorFlash>(e: SSError<F::Error>) -> StorageError {
    match e {
        #[cfg(feature = "defmt")]
        SSError::Storage { value: e, .. } => {
            error!("Flash error: {:?}", defmt::Debug2Format(&e));
            StorageError::Flash
        }
        #[cfg(not(feature = "defmt"))]
        SSError::Storage { value: _e, .. } => {
            error!("Flash error: {:?}", _e);
            StorageError::Flash
        }
        SSError::FullStorage => {
            error!("Storage is full");
            StorageError::FullStorage
        }
        SSError::Corrupted { .. } => {
            error!("Storage is corrupted");
            StorageError::Corrupted
        }
        SSError::BufferTooSmall(x) => {
            error!("Buffer too small, needs {} bytes", x);
            StorageError::BufferTooSmall(x)
        }
        SSError::SerializationError(_) => {
            error!("Map value error");
            StorageError::Serialization
        }
        _ => {
            error!("Unknown storage error");
            StorageError::Other
        }
    }
}
