use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use enumflags2::BitFlags;
use frame_table::{AllocFlag, FrameSource, FrameTable, Kpage, PageDir, PteRef, VirtPage};

/// Page directory over a map; the pte token is the raw virtual page.
#[derive(Default)]
struct MapPageDir {
    entries: BTreeMap<usize, (Kpage, bool)>,
}

impl PageDir for MapPageDir {
    fn lookup(&mut self, vpage: VirtPage, _create: bool) -> Option<PteRef> {
        let raw: usize = vpage.into();
        self.entries.contains_key(&raw).then(|| PteRef::new(raw))
    }

    fn get_page(&self, vpage: VirtPage) -> Option<Kpage> {
        let raw: usize = vpage.into();
        self.entries.get(&raw).map(|&(page, _)| page)
    }

    fn set_page(&mut self, vpage: VirtPage, page: Kpage, writable: bool) -> bool {
        let raw: usize = vpage.into();
        if self.entries.contains_key(&raw) {
            return false;
        }
        self.entries.insert(raw, (page, writable));
        true
    }

    fn page_of(&self, pte: PteRef) -> Kpage {
        let raw: usize = pte.into();
        self.entries[&raw].0
    }
}

/// Hands out scripted page addresses from the back; records every dealloc.
struct ScriptedSource {
    pages: Mutex<Vec<usize>>,
    freed: Mutex<Vec<usize>>,
}

impl ScriptedSource {
    fn new(pages: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages),
            freed: Mutex::new(Vec::new()),
        })
    }

    fn freed(&self) -> Vec<usize> {
        self.freed.lock().unwrap().clone()
    }
}

impl FrameSource for ScriptedSource {
    fn alloc(&self, _flags: BitFlags<AllocFlag>) -> Option<Kpage> {
        self.pages.lock().unwrap().pop().map(Kpage::new)
    }

    fn dealloc(&self, page: Kpage) {
        self.freed.lock().unwrap().push(page.into());
    }
}

#[test]
fn install_maps_the_page() {
    let source = ScriptedSource::new(vec![0x1000]);
    let table = FrameTable::new(source.clone());
    let mut pagedir = MapPageDir::default();

    let page = table.get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(0x10), true);
    assert_eq!(Some(Kpage::new(0x1000)), page);
    assert_eq!(Some(Kpage::new(0x1000)), pagedir.get_page(VirtPage::new(0x10)));
    assert!(source.freed().is_empty());
}

#[test]
fn exhausted_source_yields_nothing() {
    let source = ScriptedSource::new(Vec::new());
    let table = FrameTable::new(source);
    let mut pagedir = MapPageDir::default();

    let page = table.get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(0x10), true);
    assert_eq!(None, page);
}

#[test]
fn refused_install_returns_the_page() {
    let source = ScriptedSource::new(vec![0x2000, 0x1000]);
    let table = FrameTable::new(source.clone());
    let mut pagedir = MapPageDir::default();

    let first = table.get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(5), true);
    assert_eq!(Some(Kpage::new(0x1000)), first);

    // the virtual page is already bound, so 0x2000 must go straight back
    let second = table.get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(5), true);
    assert_eq!(None, second);
    assert_eq!(vec![0x2000], source.freed());
    assert_eq!(Some(Kpage::new(0x1000)), pagedir.get_page(VirtPage::new(5)));
}

#[test]
fn shared_frame_freed_by_last_referent() {
    // the source aliases one page across two mappings
    let source = ScriptedSource::new(vec![0x1000, 0x1000]);
    let table = FrameTable::new(source.clone());
    let mut pagedir = MapPageDir::default();

    assert!(table
        .get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(1), true)
        .is_some());
    assert!(table
        .get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(2), false)
        .is_some());

    let pte1 = pagedir.lookup(VirtPage::new(1), false).unwrap();
    let pte2 = pagedir.lookup(VirtPage::new(2), false).unwrap();

    table.free_page(&pagedir, pte1);
    assert!(source.freed().is_empty());

    table.free_page(&pagedir, pte2);
    assert_eq!(vec![0x1000], source.freed());
}

#[test]
fn reused_page_starts_with_a_fresh_referent_set() {
    let source = ScriptedSource::new(vec![0x1000, 0x1000]);
    let table = FrameTable::new(source.clone());
    let mut pagedir = MapPageDir::default();

    assert!(table
        .get_page(&mut pagedir, AllocFlag::User.into(), VirtPage::new(1), true)
        .is_some());
    let pte1 = pagedir.lookup(VirtPage::new(1), false).unwrap();
    table.free_page(&pagedir, pte1);
    assert_eq!(vec![0x1000], source.freed());

    // the same address comes back from the source; one referent must
    // again be enough to release it
    assert!(table
        .get_page(&mut pagedir, AllocFlag::User | AllocFlag::Zero, VirtPage::new(2), true)
        .is_some());
    let pte2 = pagedir.lookup(VirtPage::new(2), false).unwrap();
    table.free_page(&pagedir, pte2);
    assert_eq!(vec![0x1000, 0x1000], source.freed());
}
