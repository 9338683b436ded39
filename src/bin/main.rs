use std::ptr::NonNull;

use cordyceps::Linked;
use cordyceps_avl::{AvlMap, AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
struct Task {
    links: Links<Task>,
    priority: u32,
    name: &'static str,
}

impl Task {
    fn new(priority: u32, name: &'static str) -> Box<Task> {
        Box::new(Task {
            links: Links::new(),
            priority,
            name,
        })
    }
}

unsafe impl Linked<Links<Task>> for Task {
    type Handle = Box<Task>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Task>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<Task>> for Task {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.priority
    }
}

fn main() {
    let mut tasks: AvlTree<Task> = AvlTree::new();

    for (priority, name) in [(2, "b"), (0, "z"), (3, "c"), (4, "d"), (5, "e"), (1, "a"), (6, "f")] {
        tasks.insert(Task::new(priority, name));
        tasks.assert_invariants();
        println!(
            "height {}: {:?}",
            tasks.height(),
            tasks.iter().map(|t| t.name).collect::<Vec<_>>()
        );
    }

    let mut graph = String::new();
    tasks.dotgraph("tasks", &mut graph).unwrap();
    println!("{graph}");

    let first = tasks.pop_first().unwrap();
    assert_eq!(first.priority, 0);
    tasks.assert_invariants();

    let removed = tasks.remove(&3).unwrap();
    println!("removed {removed:?}");
    tasks.assert_invariants();
    println!("equal leaf depths: {}", tasks.has_equal_leaf_depths());

    drop(tasks);

    let mut map: AvlMap<&str, u32> = ["x", "y", "z"].into_iter().zip(1..).collect();
    map.insert("y", 20);
    map.assert_invariants();
    println!("{map:?}");

    match map.try_get(&"w") {
        Ok(value) => println!("w = {value}"),
        Err(e) => println!("w: {e}"),
    }
}
