mod common;
pub(crate) use crate::common::*;

mod storage_test {
    use embassy_futures::block_on;
    use kvass::config::StorageConfig;
    use kvass::layout::BoardSide;
    use kvass::storage::{ConfigKey, ConfigStore, FlashConfigStore, SideSelector};

    use super::*;

    const SECTORS: usize = 4;

    fn open(flash: &RamFlash, config: StorageConfig) -> FlashConfigStore<RamFlash> {
        block_on(FlashConfigStore::new(flash.clone(), &config))
    }

    #[test]
    fn test_first_boot_persists_left() {
        let flash = RamFlash::new(SECTORS);
        let mut store = open(&flash, StorageConfig::default());
        assert_eq!(block_on(store.get(ConfigKey::BoardSide)), Ok(None));

        assert_eq!(block_on(SideSelector::load(&mut store)), BoardSide::Left);
        assert_eq!(block_on(store.get(ConfigKey::BoardSide)), Ok(Some(0)));

        // Only the last two sectors are used by default
        assert!(flash.is_erased(0, 2 * RamFlash::SECTOR_SIZE));
        assert!(!flash.is_erased(2 * RamFlash::SECTOR_SIZE, SECTORS * RamFlash::SECTOR_SIZE));
    }

    #[test]
    fn test_side_survives_reboot() {
        let flash = RamFlash::new(SECTORS);
        let mut store = open(&flash, StorageConfig::default());
        assert_eq!(block_on(SideSelector::store(&mut store, 1)), Ok(BoardSide::Right));
        drop(store);

        let mut store = open(&flash, StorageConfig::default());
        assert_eq!(block_on(SideSelector::load(&mut store)), BoardSide::Right);

        // Latest write wins
        block_on(SideSelector::store(&mut store, 0)).unwrap();
        let mut store = open(&flash, StorageConfig::default());
        assert_eq!(block_on(SideSelector::load(&mut store)), BoardSide::Left);
    }

    #[test]
    fn test_explicit_start_address() {
        let flash = RamFlash::new(SECTORS);
        let config = StorageConfig {
            start_addr: RamFlash::SECTOR_SIZE,
            ..Default::default()
        };
        let mut store = open(&flash, config);
        block_on(SideSelector::store(&mut store, 1)).unwrap();

        assert!(flash.is_erased(0, RamFlash::SECTOR_SIZE));
        assert!(!flash.is_erased(RamFlash::SECTOR_SIZE, 3 * RamFlash::SECTOR_SIZE));
        assert!(flash.is_erased(3 * RamFlash::SECTOR_SIZE, SECTORS * RamFlash::SECTOR_SIZE));
    }

    #[test]
    fn test_corrupted_region_is_reset() {
        let flash = RamFlash::new(SECTORS);
        let mut store = open(&flash, StorageConfig::default());
        block_on(SideSelector::store(&mut store, 1)).unwrap();

        // Every page now looks closed, which no valid map can be in
        flash.scribble(2 * RamFlash::SECTOR_SIZE, SECTORS * RamFlash::SECTOR_SIZE);
        let mut store = open(&flash, StorageConfig::default());
        assert_eq!(block_on(SideSelector::load(&mut store)), BoardSide::Left);
        assert_eq!(block_on(store.get(ConfigKey::BoardSide)), Ok(Some(0)));
    }

    #[test]
    fn test_clear_storage_at_startup() {
        let flash = RamFlash::new(SECTORS);
        let mut store = open(&flash, StorageConfig::default());
        block_on(SideSelector::store(&mut store, 1)).unwrap();

        let config = StorageConfig {
            clear_storage: true,
            ..Default::default()
        };
        let mut store = open(&flash, config);
        assert_eq!(block_on(store.get(ConfigKey::BoardSide)), Ok(None));
        assert!(flash.is_erased(0, SECTORS * RamFlash::SECTOR_SIZE));
    }
}
