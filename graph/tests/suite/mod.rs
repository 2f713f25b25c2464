mod fixtures;
mod visible_graph;
